//! Role/action authorization table.
//!
//! A pure lookup with no I/O: whether a role may perform an action.
//! Ownership checks (a customer reading its own ticket) stay with the
//! caller, which has the resource in hand.

use crate::shared::error::{Error, Result};
use crate::users::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateTicket,
    ReadTicket,
    ListTickets,
    UpdateTicket,
    UpdateStatus,
    AssignTicket,
    DeleteTicket,
    UpdateUserRole,
    ListUsers,
}

pub fn permit(role: Role, action: Action) -> bool {
    use Action::*;
    match role {
        Role::Customer => matches!(action, CreateTicket | ReadTicket),
        Role::Agent => matches!(
            action,
            ReadTicket | ListTickets | UpdateTicket | UpdateStatus
        ),
        // Admins do everything except open tickets of their own.
        Role::Admin => !matches!(action, CreateTicket),
    }
}

pub fn require(role: Role, action: Action) -> Result<()> {
    if permit(role, action) {
        Ok(())
    } else {
        Err(Error::AccessDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_table_is_exhaustive() {
        use Action::*;
        // (action, [customer, agent, admin])
        let table = [
            (CreateTicket, [true, false, false]),
            (ReadTicket, [true, true, true]),
            (ListTickets, [false, true, true]),
            (UpdateTicket, [false, true, true]),
            (UpdateStatus, [false, true, true]),
            (AssignTicket, [false, false, true]),
            (DeleteTicket, [false, false, true]),
            (UpdateUserRole, [false, false, true]),
            (ListUsers, [false, false, true]),
        ];

        for (action, [customer, agent, admin]) in table {
            assert_eq!(permit(Role::Customer, action), customer, "customer / {action:?}");
            assert_eq!(permit(Role::Agent, action), agent, "agent / {action:?}");
            assert_eq!(permit(Role::Admin, action), admin, "admin / {action:?}");
        }
    }

    #[test]
    fn require_maps_to_access_denied() {
        assert!(require(Role::Admin, Action::AssignTicket).is_ok());
        assert!(matches!(
            require(Role::Customer, Action::AssignTicket),
            Err(crate::shared::error::Error::AccessDenied)
        ));
    }
}
