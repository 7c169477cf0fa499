use sqlx::{FromRow, SqlitePool};
use time::Date;

use crate::{
    auth::repo_types::UserId,
    error::AppResult,
    records::repo_types::{DailyTotal, Expense, Owned, Payload, RecordKind},
};

fn select_columns(kind: RecordKind) -> String {
    format!("id, user_id, {}", kind.columns().join(", "))
}

fn list_order(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Expense => "spent_on DESC, id DESC",
        RecordKind::Place | RecordKind::Food | RecordKind::Show => "id ASC",
    }
}

pub async fn insert<P: Payload>(db: &SqlitePool, owner: UserId, payload: &P) -> AppResult<Owned<P>> {
    let kind = P::KIND;
    let columns = kind.columns();
    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} (user_id, {}) VALUES (?, {}) RETURNING {}",
        kind.table(),
        columns.join(", "),
        placeholders,
        select_columns(kind),
    );
    let query = payload.bind(sqlx::query(&sql).bind(owner));
    let row = query.fetch_one(db).await?;
    Ok(Owned::<P>::from_row(&row)?)
}

pub async fn find_by_id<P: Payload>(db: &SqlitePool, id: i64) -> AppResult<Option<Owned<P>>> {
    let kind = P::KIND;
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ?",
        select_columns(kind),
        kind.table()
    );
    let row = sqlx::query_as::<_, Owned<P>>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

/// One page of the owner's records. Other users' rows are never read.
pub async fn list_by_owner<P: Payload>(
    db: &SqlitePool,
    owner: UserId,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<Owned<P>>> {
    let kind = P::KIND;
    let sql = format!(
        "SELECT {} FROM {} WHERE user_id = ? ORDER BY {} LIMIT ? OFFSET ?",
        select_columns(kind),
        kind.table(),
        list_order(kind),
    );
    let rows = sqlx::query_as::<_, Owned<P>>(&sql)
        .bind(owner)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

/// Every record of the owner, oldest first.
pub async fn all_by_owner<P: Payload>(db: &SqlitePool, owner: UserId) -> AppResult<Vec<Owned<P>>> {
    let kind = P::KIND;
    let sql = format!(
        "SELECT {} FROM {} WHERE user_id = ? ORDER BY id ASC",
        select_columns(kind),
        kind.table(),
    );
    let rows = sqlx::query_as::<_, Owned<P>>(&sql)
        .bind(owner)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn count_by_owner<P: Payload>(db: &SqlitePool, owner: UserId) -> AppResult<i64> {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE user_id = ?", P::KIND.table());
    let (count,): (i64,) = sqlx::query_as(&sql).bind(owner).fetch_one(db).await?;
    Ok(count)
}

/// Rewrites the payload of a record the owner holds. Returns false when no
/// such row exists for that owner.
pub async fn update<P: Payload>(
    db: &SqlitePool,
    id: i64,
    owner: UserId,
    payload: &P,
) -> AppResult<bool> {
    let kind = P::KIND;
    let assignments = kind
        .columns()
        .iter()
        .map(|c| format!("{c} = ?"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "UPDATE {} SET {} WHERE id = ? AND user_id = ?",
        kind.table(),
        assignments
    );
    let res = payload
        .bind(sqlx::query(&sql))
        .bind(id)
        .bind(owner)
        .execute(db)
        .await?;
    Ok(res.rows_affected() == 1)
}

pub async fn delete<P: Payload>(db: &SqlitePool, id: i64, owner: UserId) -> AppResult<bool> {
    let sql = format!(
        "DELETE FROM {} WHERE id = ? AND user_id = ?",
        P::KIND.table()
    );
    let res = sqlx::query(&sql).bind(id).bind(owner).execute(db).await?;
    Ok(res.rows_affected() == 1)
}

// ---- expenses by month ----

/// Expenses dated in `[from, until)`, newest first.
pub async fn expenses_between(
    db: &SqlitePool,
    owner: UserId,
    from: Date,
    until: Date,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<Owned<Expense>>> {
    let rows = sqlx::query_as::<_, Owned<Expense>>(
        r#"
        SELECT id, user_id, description, amount, spent_on
          FROM expenses
         WHERE user_id = ? AND spent_on >= ? AND spent_on < ?
         ORDER BY spent_on DESC, id DESC
         LIMIT ? OFFSET ?
        "#,
    )
    .bind(owner)
    .bind(from)
    .bind(until)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn count_expenses_between(
    db: &SqlitePool,
    owner: UserId,
    from: Date,
    until: Date,
) -> AppResult<i64> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM expenses WHERE user_id = ? AND spent_on >= ? AND spent_on < ?",
    )
    .bind(owner)
    .bind(from)
    .bind(until)
    .fetch_one(db)
    .await?;
    Ok(count)
}

/// Per-day sums in `[from, until)`, ascending by day.
pub async fn daily_totals(
    db: &SqlitePool,
    owner: UserId,
    from: Date,
    until: Date,
) -> AppResult<Vec<DailyTotal>> {
    let rows = sqlx::query_as::<_, DailyTotal>(
        r#"
        SELECT spent_on, SUM(amount) AS total
          FROM expenses
         WHERE user_id = ? AND spent_on >= ? AND spent_on < ?
         GROUP BY spent_on
         ORDER BY spent_on ASC
        "#,
    )
    .bind(owner)
    .bind(from)
    .bind(until)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;
    use crate::auth::{password::Credential, repo_types::User};
    use crate::records::repo_types::{Food, Place, Show};

    async fn user(db: &SqlitePool, name: &str) -> UserId {
        User::create(db, name, &format!("{name}@x.com"), &Credential::Legacy("pw".into()))
            .await
            .unwrap()
            .id
    }

    fn expense(description: &str, amount: f64, date: Date) -> Expense {
        Expense {
            description: description.into(),
            amount,
            date,
        }
    }

    #[tokio::test]
    async fn insert_and_read_back_each_kind() {
        let db = crate::db::memory().await;
        let alice = user(&db, "alice").await;

        let e = insert(&db, alice, &expense("rent", 800.0, date!(2024 - 03 - 01))).await.unwrap();
        assert_eq!(e.owner_id, alice);
        assert_eq!(find_by_id::<Expense>(&db, e.id).await.unwrap(), Some(e.clone()));

        let p = insert(&db, alice, &Place { name: "Porto".into() }).await.unwrap();
        let f = insert(&db, alice, &Food { name: "ramen".into() }).await.unwrap();
        let s = insert(&db, alice, &Show { name: "Dark".into() }).await.unwrap();
        assert_eq!(find_by_id::<Place>(&db, p.id).await.unwrap().unwrap().payload.name, "Porto");
        assert_eq!(find_by_id::<Food>(&db, f.id).await.unwrap().unwrap().payload.name, "ramen");
        assert_eq!(find_by_id::<Show>(&db, s.id).await.unwrap().unwrap().payload.name, "Dark");
    }

    #[tokio::test]
    async fn list_only_returns_own_rows() {
        let db = crate::db::memory().await;
        let alice = user(&db, "alice").await;
        let bob = user(&db, "bob").await;
        insert(&db, alice, &Place { name: "Rome".into() }).await.unwrap();
        insert(&db, bob, &Place { name: "Oslo".into() }).await.unwrap();
        insert(&db, alice, &Place { name: "Kyoto".into() }).await.unwrap();

        let names: Vec<_> = list_by_owner::<Place>(&db, alice, 10, 0)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.payload.name)
            .collect();
        assert_eq!(names, vec!["Rome", "Kyoto"]);
        assert_eq!(count_by_owner::<Place>(&db, bob).await.unwrap(), 1);

        let page = list_by_owner::<Place>(&db, alice, 1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].payload.name, "Kyoto");
    }

    #[tokio::test]
    async fn update_and_delete_require_the_owner() {
        let db = crate::db::memory().await;
        let alice = user(&db, "alice").await;
        let bob = user(&db, "bob").await;
        let food = insert(&db, alice, &Food { name: "taco".into() }).await.unwrap();

        assert!(!update(&db, food.id, bob, &Food { name: "stolen".into() }).await.unwrap());
        assert!(!delete::<Food>(&db, food.id, bob).await.unwrap());
        assert!(update(&db, food.id, alice, &Food { name: "burrito".into() }).await.unwrap());

        let stored = find_by_id::<Food>(&db, food.id).await.unwrap().unwrap();
        assert_eq!(stored.payload.name, "burrito");
        assert_eq!(stored.owner_id, alice);

        assert!(delete::<Food>(&db, food.id, alice).await.unwrap());
        assert!(find_by_id::<Food>(&db, food.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn month_window_and_daily_totals() {
        let db = crate::db::memory().await;
        let alice = user(&db, "alice").await;
        let bob = user(&db, "bob").await;
        for e in [
            expense("before", 5.0, date!(2024 - 02 - 29)),
            expense("a", 10.0, date!(2024 - 03 - 01)),
            expense("b", 2.5, date!(2024 - 03 - 01)),
            expense("c", 7.25, date!(2024 - 03 - 15)),
            expense("after", 99.0, date!(2024 - 04 - 01)),
        ] {
            insert(&db, alice, &e).await.unwrap();
        }
        insert(&db, bob, &expense("bob", 1000.0, date!(2024 - 03 - 10))).await.unwrap();

        let (from, until) = (date!(2024 - 03 - 01), date!(2024 - 04 - 01));
        let rows = expenses_between(&db, alice, from, until, 10, 0).await.unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.payload.description.as_str()).collect();
        assert_eq!(names, vec!["c", "b", "a"]);
        assert_eq!(count_expenses_between(&db, alice, from, until).await.unwrap(), 3);

        let daily = daily_totals(&db, alice, from, until).await.unwrap();
        assert_eq!(
            daily,
            vec![
                DailyTotal { date: date!(2024 - 03 - 01), total: 12.5 },
                DailyTotal { date: date!(2024 - 03 - 15), total: 7.25 },
            ]
        );
    }

    #[tokio::test]
    async fn deleting_a_user_cascades_to_their_records_only() {
        let db = crate::db::memory().await;
        let a = user(&db, "a").await;
        let b = user(&db, "b").await;
        for owner in [a, a, b, b] {
            insert(&db, owner, &expense("x", 1.0, date!(2024 - 01 - 01))).await.unwrap();
        }
        insert(&db, a, &Show { name: "Lost".into() }).await.unwrap();

        User::delete(&db, a).await.unwrap();

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM expenses")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(count_by_owner::<Expense>(&db, b).await.unwrap(), 2);
        assert_eq!(count_by_owner::<Show>(&db, a).await.unwrap(), 0);
    }
}
