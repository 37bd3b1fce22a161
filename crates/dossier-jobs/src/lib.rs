//! Tracking of long-running document generation requests.
//!
//! A [`JobRegistry`] starts a [`Generator`] call in the background and keeps a
//! record of its lifecycle (`running` → `completed` | `error` | `cancelled`) so
//! callers can return later and poll, subscribe, or await the outcome.

pub mod generator;
pub mod poll;
pub mod registry;
pub mod store;
pub mod types;

pub use generator::{FnGenerator, Generator, generator_fn};
pub use poll::{PollConfig, poll_job};
pub use registry::{JobRegistry, JobSubscription};
pub use store::{JobStore, JobStoreGuard};
pub use types::{Job, JobStatus, JobSummary};
