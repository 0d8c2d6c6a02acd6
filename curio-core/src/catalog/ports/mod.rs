pub mod duplicate;
pub mod job;
pub mod library;
pub mod log;
pub mod post;
pub mod schedule;
pub mod tag;

pub use duplicate::{DuplicateGroupWithEntries, DuplicateRepository};
pub use job::JobExecutionRepository;
pub use library::LibraryRepository;
pub use log::LogRepository;
pub use post::{PostAggregate, PostMove, PostRepository, PostSnapshot, PostUpdate};
pub use schedule::ScheduleRepository;
pub use tag::TagRepository;
