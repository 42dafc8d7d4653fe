pub mod eligibility;
pub mod error;
pub mod graph;
pub mod ledger;
pub mod types;

pub use eligibility::{Eligibility, ProgressCounts};
pub use error::ProgressError;
pub use graph::{CertifiedGraph, GraphError, PrerequisiteGraph};
pub use ledger::{ProgressLedger, RecordOutcome};
