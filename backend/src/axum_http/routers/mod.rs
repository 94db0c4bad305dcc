pub mod admin_orders;
pub mod checkout;
pub mod orders;
pub mod payments;
