pub mod billing_cycles;
pub mod email_statuses;
pub mod invoice_statuses;
pub mod order_statuses;
pub mod payment_statuses;
