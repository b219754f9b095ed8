//! SQLite persistence for step counts, walking modes, trainings and
//! preferences
//!
//! All repositories share the connection pool owned by [`DbManager`] and
//! run their blocking queries on the tokio blocking thread pool.

pub mod manager;
pub mod preferences_repository;
pub mod step_record_repository;
pub mod training_repository;
pub mod walking_mode_repository;

pub use manager::DbManager;
pub use preferences_repository::SqlitePreferencesRepository;
pub use step_record_repository::SqliteStepRecordRepository;
pub use training_repository::SqliteTrainingRepository;
pub use walking_mode_repository::SqliteWalkingModeRepository;
