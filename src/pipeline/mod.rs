//! The NAV pipeline: validation with bounded fallback, hierarchical
//! aggregation and output filtering.

pub mod aggregator;
pub mod fallback;
pub mod filters;
mod run;
pub mod shares;
pub mod validator;

pub use aggregator::aggregate;
pub use fallback::{FallbackResolver, WindowFallbackResolver};
pub use filters::{DropReason, OutputFilter};
pub use run::{NavPipeline, RunOutcome};
pub use shares::latest_shares;
pub use validator::{validate, ValidationOutcome};
