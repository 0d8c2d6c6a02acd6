pub mod duplicate;
pub mod job;
pub mod library;
pub mod log;
pub mod post;
pub mod schedule;
pub mod tag;

pub use duplicate::SqliteDuplicateRepository;
pub use job::SqliteJobExecutionRepository;
pub use library::SqliteLibraryRepository;
pub use log::SqliteLogRepository;
pub use post::SqlitePostRepository;
pub use schedule::SqliteScheduleRepository;
pub use tag::SqliteTagRepository;
