pub mod live_channel;
pub mod live_qr;
pub mod qr_gateway;
pub mod standard_qr;
