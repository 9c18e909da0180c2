pub mod cli;
pub mod daemon;
pub mod errors;
pub mod models;
pub mod scraper;
pub mod server;
pub mod storage;
