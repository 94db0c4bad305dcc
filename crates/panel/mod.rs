pub mod panel_client;
