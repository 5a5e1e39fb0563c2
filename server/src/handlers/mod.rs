pub mod job_handlers;
pub mod suggestion_handlers;
