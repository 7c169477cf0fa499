use serde::{Deserialize, Serialize};
use sqlx::{
    query::Query,
    sqlite::{SqliteArguments, SqliteRow},
    FromRow, Row, Sqlite,
};
use time::Date;

use crate::auth::repo_types::UserId;

pub type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// The four kinds of things a user keeps in the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Expense,
    Place,
    Food,
    Show,
}

impl RecordKind {
    pub const fn table(self) -> &'static str {
        match self {
            RecordKind::Expense => "expenses",
            RecordKind::Place => "places",
            RecordKind::Food => "foods",
            RecordKind::Show => "shows",
        }
    }

    /// Payload columns, in bind order.
    pub const fn columns(self) -> &'static [&'static str] {
        match self {
            RecordKind::Expense => &["description", "amount", "spent_on"],
            RecordKind::Place | RecordKind::Food | RecordKind::Show => &["name"],
        }
    }

    /// Label used in the `Type` column of the CSV export.
    pub const fn label(self) -> &'static str {
        match self {
            RecordKind::Expense => "Expense",
            RecordKind::Place => "Place",
            RecordKind::Food => "Food",
            RecordKind::Show => "Show",
        }
    }
}

/// Row content of one record kind, everything except id and owner.
pub trait Payload: Serialize + Sized + Send + Sync + Unpin + 'static {
    const KIND: RecordKind;

    fn decode(row: &SqliteRow) -> sqlx::Result<Self>;

    /// Binds the payload columns in `KIND.columns()` order.
    fn bind<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q>;
}

/// A stored record and the user it belongs to. `owner_id` is set on insert
/// and never written again.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Owned<P> {
    pub id: i64,
    #[serde(skip)]
    pub owner_id: UserId,
    #[serde(flatten)]
    pub payload: P,
}

impl<'r, P: Payload> FromRow<'r, SqliteRow> for Owned<P> {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        Ok(Owned {
            id: row.try_get("id")?,
            owner_id: row.try_get("user_id")?,
            payload: P::decode(row)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub description: String,
    pub amount: f64,
    pub date: Date,
}

impl Payload for Expense {
    const KIND: RecordKind = RecordKind::Expense;

    fn decode(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Expense {
            description: row.try_get("description")?,
            amount: row.try_get("amount")?,
            date: row.try_get("spent_on")?,
        })
    }

    fn bind<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.description.as_str())
            .bind(self.amount)
            .bind(self.date)
    }
}

macro_rules! named_payload {
    ($name:ident, $kind:expr) => {
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            pub name: String,
        }

        impl Payload for $name {
            const KIND: RecordKind = $kind;

            fn decode(row: &SqliteRow) -> sqlx::Result<Self> {
                Ok($name {
                    name: row.try_get("name")?,
                })
            }

            fn bind<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
                query.bind(self.name.as_str())
            }
        }

        impl From<String> for $name {
            fn from(name: String) -> Self {
                $name { name }
            }
        }
    };
}

named_payload!(Place, RecordKind::Place);
named_payload!(Food, RecordKind::Food);
named_payload!(Show, RecordKind::Show);

/// Spending on one calendar day, for the chart.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct DailyTotal {
    #[sqlx(rename = "spent_on")]
    pub date: Date,
    pub total: f64,
}
