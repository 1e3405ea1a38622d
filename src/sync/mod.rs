pub mod engine;
pub mod report;

pub use engine::{EngineConfig, SyncEngine};
pub use report::SyncReport;
