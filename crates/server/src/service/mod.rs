pub mod bootstrap;
pub mod submission;

pub use bootstrap::ensure_admin;
pub use submission::{SubmissionError, SubmissionOutcome, SubmissionService};
