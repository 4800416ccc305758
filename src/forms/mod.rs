//! Adaptive questionnaire engine.
//!
//! - [`FormRegistry`]: creates forms from a description, lookup and listing
//! - [`FollowUpOrchestrator`]: appends generated follow-ups at answer time
//! - [`SubmissionRecorder`]: persists completed response sets
//! - [`AnalyticsAggregator`]: distributions, narrative reports, strategies
//!
//! All components share storage, the generator and the per-form lock table
//! through [`FormsCore`].

mod analytics;
mod core;
mod follow_up;
mod locks;
mod registry;
mod submissions;

pub use analytics::*;
pub use core::*;
pub use follow_up::*;
pub use locks::*;
pub use registry::*;
pub use submissions::*;
