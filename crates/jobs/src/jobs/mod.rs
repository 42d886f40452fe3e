mod dispatch;
mod metrics;

pub use dispatch::{dispatch_due_jobs, enqueue_now};
pub use metrics::{RunStatus, process_metrics_job};
