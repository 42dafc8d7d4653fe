pub mod catalog;
pub mod progress;

pub use progress::ProgressService;
