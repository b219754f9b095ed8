//! Backup restore

pub mod restorer;

pub use restorer::BackupRestorer;
