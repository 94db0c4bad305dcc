use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a hosted server order. Transitions are validated through
/// `can_transition_to`; callers must never write a status the table rejects.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Provisioning,
    Active,
    Failed,
    Suspended,
    Cancelled,
    Terminated,
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Provisioning => "provisioning",
            OrderStatus::Active => "active",
            OrderStatus::Failed => "failed",
            OrderStatus::Suspended => "suspended",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Terminated => "terminated",
        };
        write!(f, "{}", status)
    }
}

impl OrderStatus {
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(OrderStatus::Pending),
            "paid" => Some(OrderStatus::Paid),
            "provisioning" => Some(OrderStatus::Provisioning),
            "active" => Some(OrderStatus::Active),
            "failed" => Some(OrderStatus::Failed),
            "suspended" => Some(OrderStatus::Suspended),
            "cancelled" => Some(OrderStatus::Cancelled),
            "terminated" => Some(OrderStatus::Terminated),
            _ => None,
        }
    }

    /// Cancelled and terminated orders accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Terminated)
    }

    /// The order lifecycle transition table.
    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        match (*self, to) {
            (Pending, Paid) => true,
            (Paid, Provisioning) => true,
            (Provisioning, Active) => true,
            (Provisioning, Failed) => true,
            (Failed, Provisioning) => true,
            (Active, Suspended) => true,
            (Suspended, Active) => true,
            (Pending | Paid | Active | Suspended, Cancelled) => true,
            (Pending | Paid | Active | Suspended, Terminated) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_are_legal() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Paid));
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Provisioning));
        assert!(OrderStatus::Provisioning.can_transition_to(OrderStatus::Active));
        assert!(OrderStatus::Provisioning.can_transition_to(OrderStatus::Failed));
        assert!(OrderStatus::Failed.can_transition_to(OrderStatus::Provisioning));
    }

    #[test]
    fn suspension_is_reversible() {
        assert!(OrderStatus::Active.can_transition_to(OrderStatus::Suspended));
        assert!(OrderStatus::Suspended.can_transition_to(OrderStatus::Active));
    }

    #[test]
    fn active_cannot_be_reached_without_provisioning() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Active));
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Active));
    }

    #[test]
    fn terminal_states_accept_nothing() {
        for to in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Provisioning,
            OrderStatus::Active,
            OrderStatus::Failed,
            OrderStatus::Suspended,
            OrderStatus::Cancelled,
            OrderStatus::Terminated,
        ] {
            assert!(!OrderStatus::Cancelled.can_transition_to(to));
            assert!(!OrderStatus::Terminated.can_transition_to(to));
        }
    }

    #[test]
    fn round_trips_through_strings() {
        let statuses = [
            OrderStatus::Pending,
            OrderStatus::Provisioning,
            OrderStatus::Suspended,
            OrderStatus::Terminated,
        ];
        for status in statuses {
            assert_eq!(OrderStatus::from_str(&status.to_string()), Some(status));
        }
        assert_eq!(OrderStatus::from_str("deleted"), None);
    }
}
