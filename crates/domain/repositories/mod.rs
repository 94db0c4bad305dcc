pub mod email_logs;
pub mod invoice_reminders;
pub mod invoices;
pub mod orders;
pub mod payments;
