use std::{borrow::Cow, fmt::Write};

use sqlx::SqlitePool;
use time::{macros::format_description, Date, Duration, OffsetDateTime};
use tracing::info;

use crate::{
    auth::repo_types::UserId,
    error::{AppError, AppResult},
    records::{
        dto::{ExpenseInput, Favorites, HomeSummary, Page, Pagination},
        ownership::ensure_owner,
        repo,
        repo_types::{Expense, Food, Owned, Payload, Place, RecordKind, Show},
    },
};

pub const CSV_HEADER: &str = "Type,Name/Description,Amount,Date";

pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// First day of `day`'s month and first day of the following month.
pub fn month_bounds(day: Date) -> (Date, Date) {
    let start = day - Duration::days(i64::from(day.day()) - 1);
    let len = start.month().length(start.year());
    (start, start + Duration::days(i64::from(len)))
}

fn round_cents(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub async fn create_owned<P: Payload>(db: &SqlitePool, owner: UserId, payload: P) -> AppResult<Owned<P>> {
    let record = repo::insert(db, owner, &payload).await?;
    info!(kind = P::KIND.label(), record_id = record.id, %owner, "record created");
    Ok(record)
}

pub async fn list_owned<P: Payload>(
    db: &SqlitePool,
    owner: UserId,
    page: Pagination,
) -> AppResult<Page<Owned<P>>> {
    let page = page.clamped();
    let items = repo::list_by_owner::<P>(db, owner, page.limit, page.offset).await?;
    let total = repo::count_by_owner::<P>(db, owner).await?;
    Ok(Page {
        items,
        total,
        limit: page.limit,
        offset: page.offset,
    })
}

pub async fn update_owned<P: Payload>(
    db: &SqlitePool,
    id: i64,
    requester: UserId,
    payload: P,
) -> AppResult<Owned<P>> {
    update_owned_with(db, id, requester, |_| Ok(payload)).await
}

/// Existence, then ownership, then the write. Nothing is written when either
/// check fails. `build` sees the stored payload and returns its replacement.
pub async fn update_owned_with<P, F>(
    db: &SqlitePool,
    id: i64,
    requester: UserId,
    build: F,
) -> AppResult<Owned<P>>
where
    P: Payload,
    F: FnOnce(&P) -> AppResult<P>,
{
    let record = repo::find_by_id::<P>(db, id).await?.ok_or(AppError::NotFound)?;
    ensure_owner(&record, requester)?;
    let payload = build(&record.payload)?;
    if !repo::update(db, id, requester, &payload).await? {
        return Err(AppError::NotFound);
    }
    info!(kind = P::KIND.label(), record_id = id, %requester, "record updated");
    Ok(Owned {
        id,
        owner_id: record.owner_id,
        payload,
    })
}

/// An update without a date keeps the stored one.
pub async fn update_expense(
    db: &SqlitePool,
    id: i64,
    requester: UserId,
    input: ExpenseInput,
) -> AppResult<Owned<Expense>> {
    update_owned_with(db, id, requester, |stored: &Expense| input.into_payload(stored.date)).await
}

pub async fn delete_owned<P: Payload>(db: &SqlitePool, id: i64, requester: UserId) -> AppResult<()> {
    let record = repo::find_by_id::<P>(db, id).await?.ok_or(AppError::NotFound)?;
    ensure_owner(&record, requester)?;
    if !repo::delete::<P>(db, id, requester).await? {
        return Err(AppError::NotFound);
    }
    info!(kind = P::KIND.label(), record_id = id, %requester, "record deleted");
    Ok(())
}

pub async fn favorites(db: &SqlitePool, owner: UserId) -> AppResult<Favorites> {
    Ok(Favorites {
        places: repo::all_by_owner::<Place>(db, owner).await?,
        foods: repo::all_by_owner::<Food>(db, owner).await?,
        shows: repo::all_by_owner::<Show>(db, owner).await?,
    })
}

/// This month's spending against the budget, plus chart data.
pub async fn home_summary(
    db: &SqlitePool,
    owner: UserId,
    budget: f64,
    today: Date,
    page: Pagination,
) -> AppResult<HomeSummary> {
    let page = page.clamped();
    let (from, until) = month_bounds(today);

    let daily_totals = repo::daily_totals(db, owner, from, until).await?;
    let total_spent = round_cents(daily_totals.iter().map(|d| d.total).sum());
    let items = repo::expenses_between(db, owner, from, until, page.limit, page.offset).await?;
    let total = repo::count_expenses_between(db, owner, from, until).await?;

    Ok(HomeSummary {
        month_start: from,
        budget,
        total_spent,
        remaining_budget: round_cents(budget - total_spent),
        expenses: Page {
            items,
            total,
            limit: page.limit,
            offset: page.offset,
        },
        daily_totals,
    })
}

fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

fn push_row(out: &mut String, kind: RecordKind, name: &str, amount: &str, date: &str) {
    // writing into a String cannot fail
    let _ = write!(out, "{},{},{},{}\r\n", kind.label(), csv_field(name), amount, date);
}

/// Everything the user owns as CSV: expenses, places, foods, shows.
pub async fn export_csv(db: &SqlitePool, owner: UserId) -> AppResult<String> {
    let iso_date = format_description!("[year]-[month]-[day]");
    let mut out = String::new();
    out.push_str(CSV_HEADER);
    out.push_str("\r\n");

    for e in repo::all_by_owner::<Expense>(db, owner).await? {
        let date = e
            .payload
            .date
            .format(iso_date)
            .map_err(|err| AppError::Internal(err.into()))?;
        let amount = format!("{:.2}", e.payload.amount);
        push_row(&mut out, RecordKind::Expense, &e.payload.description, &amount, &date);
    }
    for p in repo::all_by_owner::<Place>(db, owner).await? {
        push_row(&mut out, RecordKind::Place, &p.payload.name, "", "");
    }
    for f in repo::all_by_owner::<Food>(db, owner).await? {
        push_row(&mut out, RecordKind::Food, &f.payload.name, "", "");
    }
    for s in repo::all_by_owner::<Show>(db, owner).await? {
        push_row(&mut out, RecordKind::Show, &s.payload.name, "", "");
    }
    info!(%owner, "csv export");
    Ok(out)
}
