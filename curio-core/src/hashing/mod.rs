pub mod xxhash;

pub use xxhash::XxHashContentHasher;
