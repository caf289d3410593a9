pub mod ai;
pub mod backup;

pub use backup::{BackupService, BackupSnapshot};
