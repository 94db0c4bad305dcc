pub mod mailer_client;
