pub mod config;
pub mod job;

pub use config::DaemonConfig;
pub use job::{JobStatus, NewScrapeJob, ScrapeJob, ScrapeResults};
