//! Asynchronous analysis jobs.
//!
//! The [`AnalysisJobManager`] runs each impact analysis as a cancellable,
//! progress-reporting unit of work over a submission-time snapshot.

pub mod manager;

pub use manager::{
    AnalysisJob, AnalysisJobManager, AnalysisReport, AnalysisRequest, JobError, JobEvent,
    JobStatus, JobStatusReport, JobsConfig,
};
