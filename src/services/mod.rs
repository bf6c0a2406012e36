pub mod export;
pub mod merge_engine;
pub mod stats_engine;
pub mod sync_engine;
