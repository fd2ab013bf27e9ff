//! Access control guard
//!
//! Single authorization point for every mutating call. Handlers never do
//! inline role comparisons; they describe the attempted [`Action`] and let
//! [`authorize`] decide.
//!
//! Two failure modes are kept distinct:
//! - missing/invalid principal never reaches this module (the auth
//!   middleware rejects with 401 first)
//! - a valid principal with insufficient privilege is rejected here with
//!   403 (`AdminRequired` or `NotResourceOwner`)

use shared::ErrorCode;

use crate::auth::CurrentUser;
use crate::utils::AppError;

/// An operation a principal is attempting on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    /// Create, update or delete products, reviews excluded
    ManageCatalog,
    /// Create or delete coupon codes, list all coupons
    ManageCoupons,
    /// List every order in the system
    ListAllOrders,
    /// Force an order status transition
    SetOrderStatus,
    /// Trigger an expiry sweep
    TriggerSweep,
    /// Read one order, including its lines
    ViewOrder { owner: &'a str },
    /// Confirm payment for one order
    PayOrder { owner: &'a str },
}

impl Action<'_> {
    fn requires_admin(&self) -> bool {
        matches!(
            self,
            Action::ManageCatalog
                | Action::ManageCoupons
                | Action::ListAllOrders
                | Action::SetOrderStatus
                | Action::TriggerSweep
        )
    }

    fn owner(&self) -> Option<&str> {
        match self {
            Action::ViewOrder { owner } | Action::PayOrder { owner } => Some(owner),
            _ => None,
        }
    }
}

/// Authorize `user` to perform `action`.
///
/// Admins pass every check. Ordinary users pass owner-scoped actions only
/// when they own the resource.
pub fn authorize(user: &CurrentUser, action: Action<'_>) -> Result<(), AppError> {
    if user.is_admin() {
        return Ok(());
    }

    if action.requires_admin() {
        tracing::warn!(
            user_id = %user.id,
            username = %user.username,
            action = ?action,
            "Admin action denied"
        );
        return Err(AppError::new(ErrorCode::AdminRequired));
    }

    if let Some(owner) = action.owner()
        && owner != user.id
    {
        tracing::warn!(
            user_id = %user.id,
            owner = %owner,
            action = ?action,
            "Ownership check failed"
        );
        return Err(AppError::new(ErrorCode::NotResourceOwner));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> CurrentUser {
        CurrentUser {
            id: "user:admin".to_string(),
            username: "root".to_string(),
            role: "admin".to_string(),
        }
    }

    fn buyer(id: &str) -> CurrentUser {
        CurrentUser {
            id: id.to_string(),
            username: "buyer".to_string(),
            role: "user".to_string(),
        }
    }

    #[test]
    fn test_admin_passes_everything() {
        let user = admin();
        assert!(authorize(&user, Action::ManageCatalog).is_ok());
        assert!(authorize(&user, Action::ListAllOrders).is_ok());
        assert!(authorize(&user, Action::PayOrder { owner: "user:other" }).is_ok());
    }

    #[test]
    fn test_user_denied_admin_actions() {
        let user = buyer("user:1");
        for action in [
            Action::ManageCatalog,
            Action::ManageCoupons,
            Action::ListAllOrders,
            Action::SetOrderStatus,
            Action::TriggerSweep,
        ] {
            let err = authorize(&user, action).unwrap_err();
            assert_eq!(err.code, ErrorCode::AdminRequired);
        }
    }

    #[test]
    fn test_ownership() {
        let user = buyer("user:1");
        assert!(authorize(&user, Action::PayOrder { owner: "user:1" }).is_ok());
        let err = authorize(&user, Action::PayOrder { owner: "user:2" }).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotResourceOwner);
    }
}
