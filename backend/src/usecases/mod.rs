pub mod checkout;
pub mod order_lifecycle;
pub mod orders_query;
pub mod payment_watch;
