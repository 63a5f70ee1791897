use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::core::{CustomerId, LedgerError, LedgerResult};

/// Claims of an already verified session token. Issuing and verifying the
/// token happens outside the ledger.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub customer_id: CustomerId,
    pub expires_at: DateTime<Utc>
}

impl Claims {
    pub fn new(customer_id: CustomerId, expires_at: DateTime<Utc>) -> Claims {
        Claims { customer_id, expires_at }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Who is calling a ledger operation. Passed explicitly into every
/// operation.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Caller {
    /// Trusted operator tooling; bypasses ownership checks.
    System,
    Customer(Claims)
}

/// Decides whether a caller may act on accounts owned by `customer_id`.
pub trait Authorizer: Send + Sync {
    fn validate_caller_owns_account(&self, caller: &Caller, customer_id: CustomerId) -> LedgerResult<()>;

    fn require_system(&self, caller: &Caller) -> LedgerResult<()> {
        match caller {
            Caller::System => Ok(()),
            Caller::Customer(claims) => Err(LedgerError::PermissionDenied(
                format!("customer {} may not list the whole ledger", claims.customer_id)))
        }
    }
}

/// Lets customers touch only their own, unexpired, accounts.
#[derive(Clone, Copy, Debug, Default)]
pub struct OwnerAuthorizer;

impl Authorizer for OwnerAuthorizer {
    fn validate_caller_owns_account(&self, caller: &Caller, customer_id: CustomerId) -> LedgerResult<()> {
        let claims = match caller {
            Caller::System => return Ok(()),
            Caller::Customer(claims) => claims
        };

        if claims.is_expired(Utc::now()) {
            return Err(LedgerError::PermissionDenied("session expired".to_owned()));
        }
        if claims.customer_id != customer_id {
            return Err(LedgerError::PermissionDenied(
                format!("customer {} does not own this account", claims.customer_id)));
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use crate::core::{Authorizer, Caller, Claims, ErrorCode, OwnerAuthorizer};

    use chrono::{Duration, Utc};
    use rstest::rstest;

    fn customer(id: u64, ttl: Duration) -> Caller {
        Caller::Customer(Claims::new(id, Utc::now() + ttl))
    }

    #[rstest]
    fn system_is_always_allowed() {
        assert!(OwnerAuthorizer.validate_caller_owns_account(&Caller::System, 42).is_ok());
        assert!(OwnerAuthorizer.require_system(&Caller::System).is_ok());
    }

    #[rstest]
    fn owner_is_allowed() {
        let caller = customer(42, Duration::minutes(15));
        assert!(OwnerAuthorizer.validate_caller_owns_account(&caller, 42).is_ok());
    }

    #[rstest]
    #[case(customer(7, Duration::minutes(15)))]
    #[case(customer(42, Duration::minutes(-1)))]
    fn denied(#[case] caller: Caller) {
        let err = OwnerAuthorizer.validate_caller_owns_account(&caller, 42).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PermissionDenied);
    }

    #[rstest]
    fn customers_cannot_list_everything() {
        let caller = customer(42, Duration::minutes(15));
        assert!(OwnerAuthorizer.require_system(&caller).is_err());
    }
}
