pub mod enqueue;
pub mod org;
pub mod repo;
pub mod run;
pub mod serve;
