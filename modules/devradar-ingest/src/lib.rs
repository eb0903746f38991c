pub mod adapters;
pub mod committer;
pub mod cursor;
pub mod dedup;
pub mod normalize;
pub mod retry;
pub mod run;
pub mod run_log;
pub mod sources;
pub mod stats;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;
