pub mod job_loop;
