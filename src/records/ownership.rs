//! Ownership check applied before any record is changed or removed.
//!
//! Listing never needs it: list queries filter on the owner column, so rows
//! belonging to someone else are never fetched. Single-record mutations look
//! the row up by id first and must ask here before writing.

use tracing::warn;

use crate::{
    auth::repo_types::UserId,
    error::{AppError, AppResult},
    records::repo_types::{Owned, Payload},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Authorized,
    Forbidden,
}

impl Authorization {
    pub fn into_result(self) -> AppResult<()> {
        match self {
            Authorization::Authorized => Ok(()),
            Authorization::Forbidden => Err(AppError::Forbidden),
        }
    }
}

pub fn authorize_mutation<P>(record: &Owned<P>, requester: UserId) -> Authorization {
    if record.owner_id == requester {
        Authorization::Authorized
    } else {
        Authorization::Forbidden
    }
}

/// `authorize_mutation` as a `Result`, logging refusals.
pub fn ensure_owner<P: Payload>(record: &Owned<P>, requester: UserId) -> AppResult<()> {
    let decision = authorize_mutation(record, requester);
    if decision == Authorization::Forbidden {
        warn!(
            kind = P::KIND.label(),
            record_id = record.id,
            owner_id = %record.owner_id,
            %requester,
            "ownership check failed"
        );
    }
    decision.into_result()
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;
    use crate::records::repo_types::{Expense, Food, Place, Show};

    fn owned<P>(owner: i64, payload: P) -> Owned<P> {
        Owned {
            id: 1,
            owner_id: UserId(owner),
            payload,
        }
    }

    fn check_all_pairs<P: Payload + Clone>(payload: P) {
        for owner in 1..=3 {
            for requester in 1..=3 {
                let record = owned(owner, payload.clone());
                let expected = if owner == requester {
                    Authorization::Authorized
                } else {
                    Authorization::Forbidden
                };
                assert_eq!(authorize_mutation(&record, UserId(requester)), expected);
                assert_eq!(
                    ensure_owner(&record, UserId(requester)).is_ok(),
                    owner == requester
                );
            }
        }
    }

    #[test]
    fn owner_only_for_every_kind() {
        check_all_pairs(Expense {
            description: "coffee".into(),
            amount: 3.5,
            date: date!(2024 - 05 - 01),
        });
        check_all_pairs(Place { name: "Lisbon".into() });
        check_all_pairs(Food { name: "pho".into() });
        check_all_pairs(Show { name: "Severance".into() });
    }

    #[test]
    fn forbidden_maps_to_forbidden_error() {
        let err = Authorization::Forbidden.into_result().unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }
}
