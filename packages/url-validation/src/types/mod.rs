pub mod components;
pub mod job;
pub mod record;
pub mod validation;

pub use components::{DomainParts, UrlComponents};
pub use job::{JobBatch, JobContext, JobKind, PendingJob, Tweet, TweetJob, UrlJob};
pub use record::{ErrorRecord, PersistOutcome, TweetUrlRow, UrlHistoryRow, UrlRow};
pub use validation::{Outcome, RedirectHop, ValidationResult};
