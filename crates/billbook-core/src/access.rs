//! # Access Control
//!
//! The single role → capability table. Handlers ask `role.can(cap)` once,
//! at the boundary, and nowhere else.
//!
//! ```text
//! ┌──────────────────────┬───────┬────────┬──────────┬───────┬────────┐
//! │ Capability           │ Admin │ Editor │ Customer │ Agent │ Vendor │
//! ├──────────────────────┼───────┼────────┼──────────┼───────┼────────┤
//! │ CreateBill           │   ✓   │   ✓    │          │       │        │
//! │ ReadBills            │   ✓   │   ✓    │          │       │        │
//! │ UpdateBill           │   ✓   │   ✓    │          │       │        │
//! │ AllotRefund          │   ✓   │   ✓    │          │       │        │
//! │ ManageItems          │   ✓   │   ✓    │          │       │        │
//! │ ManageAgents         │   ✓   │   ✓    │          │       │        │
//! │ DeleteBill           │   ✓   │        │          │       │        │
//! │ ResolveReturn        │   ✓   │        │          │       │        │
//! │ ReadAllReports       │   ✓   │        │          │       │        │
//! │ SubmitReturn         │   ✓   │   ✓    │    ✓     │   ✓   │   ✓    │
//! │ ListReturnRequests   │   ✓   │   ✓    │    ✓     │   ✓   │   ✓    │
//! │ ReadNotifications    │   ✓   │   ✓    │    ✓     │   ✓   │   ✓    │
//! │ RequestExchange      │       │   ✓    │    ✓     │   ✓   │   ✓    │
//! └──────────────────────┴───────┴────────┴──────────┴───────┴────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{BillScope, Principal, Role};

/// Something a caller may be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    CreateBill,
    ReadBills,
    UpdateBill,
    DeleteBill,
    AllotRefund,
    ManageItems,
    ManageAgents,
    ResolveReturn,
    ReadAllReports,
    SubmitReturn,
    ListReturnRequests,
    ReadNotifications,
    RequestExchange,
}

impl Role {
    /// Whether this role holds `capability`.
    pub const fn can(&self, capability: Capability) -> bool {
        use Capability::*;

        match capability {
            CreateBill | ReadBills | UpdateBill | AllotRefund | ManageItems | ManageAgents => {
                matches!(self, Role::Admin | Role::Editor)
            }
            DeleteBill | ResolveReturn | ReadAllReports => matches!(self, Role::Admin),
            SubmitReturn | ListReturnRequests | ReadNotifications => true,
            RequestExchange => !matches!(self, Role::Admin),
        }
    }
}

impl Principal {
    /// Fails with `Forbidden` unless the principal's role holds `capability`.
    pub fn require(&self, capability: Capability) -> CoreResult<()> {
        if self.role.can(capability) {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "{} cannot perform {:?}",
                self.role, capability
            )))
        }
    }

    /// Admins read everything; everyone else reads what they created.
    pub fn bill_scope(&self) -> BillScope {
        if self.role.can(Capability::ReadAllReports) {
            BillScope::All
        } else {
            BillScope::CreatedBy(self.id.clone())
        }
    }

    /// Scope for a "my ..." endpoint, which is always the caller's own bills.
    pub fn own_scope(&self) -> BillScope {
        BillScope::CreatedBy(self.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal {
            id: "u1".to_string(),
            username: "someone".to_string(),
            role,
        }
    }

    #[test]
    fn test_admin_capabilities() {
        assert!(Role::Admin.can(Capability::DeleteBill));
        assert!(Role::Admin.can(Capability::ResolveReturn));
        assert!(!Role::Admin.can(Capability::RequestExchange));
    }

    #[test]
    fn test_editor_capabilities() {
        assert!(Role::Editor.can(Capability::CreateBill));
        assert!(Role::Editor.can(Capability::AllotRefund));
        assert!(Role::Editor.can(Capability::RequestExchange));
        assert!(!Role::Editor.can(Capability::DeleteBill));
        assert!(!Role::Editor.can(Capability::ResolveReturn));
    }

    #[test]
    fn test_customer_capabilities() {
        assert!(Role::Customer.can(Capability::SubmitReturn));
        assert!(Role::Customer.can(Capability::RequestExchange));
        assert!(!Role::Customer.can(Capability::CreateBill));
        assert!(!Role::Customer.can(Capability::ReadBills));
    }

    #[test]
    fn test_require_reports_forbidden() {
        let err = principal(Role::Vendor)
            .require(Capability::CreateBill)
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
        assert!(principal(Role::Vendor).require(Capability::SubmitReturn).is_ok());
    }

    #[test]
    fn test_bill_scope() {
        assert_eq!(principal(Role::Admin).bill_scope(), BillScope::All);
        assert_eq!(
            principal(Role::Editor).bill_scope(),
            BillScope::CreatedBy("u1".to_string())
        );
        assert_eq!(
            principal(Role::Admin).own_scope(),
            BillScope::CreatedBy("u1".to_string())
        );
    }
}
