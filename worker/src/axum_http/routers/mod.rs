pub mod daily_job;
