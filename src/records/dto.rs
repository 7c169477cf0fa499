use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    error::{AppError, AppResult},
    records::repo_types::{DailyTotal, Expense, Food, Owned, Place, Show},
};

pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 { 20 }

impl Default for Pagination {
    fn default() -> Self {
        Self { limit: default_limit(), offset: 0 }
    }
}

impl Pagination {
    /// Limit clamped to `1..=MAX_PAGE_SIZE`, offset to `>= 0`.
    pub fn clamped(self) -> Self {
        Self {
            limit: self.limit.clamp(1, MAX_PAGE_SIZE),
            offset: self.offset.max(0),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Deserialize)]
pub struct ExpenseInput {
    pub description: String,
    pub amount: f64,
    pub date: Option<Date>,
}

impl ExpenseInput {
    /// Validated payload; a missing date falls back to `default_date`.
    pub fn into_payload(self, default_date: Date) -> AppResult<Expense> {
        let description = self.description.trim().to_string();
        if description.is_empty() {
            return Err(AppError::bad_request("Description must not be empty"));
        }
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(AppError::bad_request("Amount must be a non-negative number"));
        }
        Ok(Expense {
            description,
            amount: self.amount,
            date: self.date.unwrap_or(default_date),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct NameInput {
    pub name: String,
}

impl NameInput {
    pub fn into_payload<P: From<String>>(self) -> AppResult<P> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::bad_request("Name must not be empty"));
        }
        Ok(P::from(name.to_string()))
    }
}

#[derive(Debug, Serialize)]
pub struct HomeSummary {
    pub month_start: Date,
    pub budget: f64,
    pub total_spent: f64,
    pub remaining_budget: f64,
    pub expenses: Page<Owned<Expense>>,
    pub daily_totals: Vec<DailyTotal>,
}

#[derive(Debug, Serialize)]
pub struct Favorites {
    pub places: Vec<Owned<Place>>,
    pub foods: Vec<Owned<Food>>,
    pub shows: Vec<Owned<Show>>,
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    #[test]
    fn pagination_is_clamped() {
        let p = Pagination { limit: 1000, offset: -4 }.clamped();
        assert_eq!((p.limit, p.offset), (MAX_PAGE_SIZE, 0));
        let p = Pagination { limit: 0, offset: 3 }.clamped();
        assert_eq!((p.limit, p.offset), (1, 3));
    }

    #[test]
    fn expense_input_defaults_date_and_validates() {
        let today = date!(2024 - 06 - 10);
        let e = ExpenseInput { description: " lunch ".into(), amount: 12.0, date: None }
            .into_payload(today)
            .unwrap();
        assert_eq!(e.description, "lunch");
        assert_eq!(e.date, today);

        for amount in [f64::NAN, f64::INFINITY, -1.0] {
            let res = ExpenseInput { description: "x".into(), amount, date: None }.into_payload(today);
            assert!(matches!(res, Err(AppError::BadRequest(_))));
        }
        let res = ExpenseInput { description: "  ".into(), amount: 1.0, date: None }.into_payload(today);
        assert!(matches!(res, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn expense_input_parses_iso_dates() {
        let input: ExpenseInput =
            serde_json::from_str(r#"{"description":"tea","amount":2.5,"date":"2024-02-29"}"#).unwrap();
        assert_eq!(input.date, Some(date!(2024 - 02 - 29)));
    }

    #[test]
    fn name_input_trims() {
        let place: Place = NameInput { name: "  Lyon ".into() }.into_payload().unwrap();
        assert_eq!(place.name, "Lyon");
        assert!(NameInput { name: "".into() }.into_payload::<Show>().is_err());
    }

    #[test]
    fn owned_records_serialize_flat() {
        let owned = Owned {
            id: 3,
            owner_id: crate::auth::repo_types::UserId(9),
            payload: Expense { description: "tea".into(), amount: 2.5, date: date!(2024 - 02 - 29) },
        };
        let json = serde_json::to_value(&owned).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": 3, "description": "tea", "amount": 2.5, "date": "2024-02-29"})
        );
    }
}
