pub mod api;
pub mod config;
pub mod merge;
pub mod models;
pub mod records;
pub mod store;
pub mod util;
