//! Analysis job manager.
//!
//! Wraps a full impact-analysis run (traversal, metrics, scoring, cost) as
//! an asynchronous, cancellable, progress-reporting job. Jobs operate only
//! on the snapshot taken at submission time and never mutate the live
//! store, so an internal failure can never leave the graph partially
//! updated.
//!
//! State machine: `PENDING -> RUNNING -> {COMPLETED | FAILED | CANCELLED}`.
//! Terminal states are final. Cancellation is cooperative: the flag is
//! checked between traversal levels and between metric computations.

use crate::error::{Result, TrellisError};
use crate::graph::{traverse_cancellable, Direction, GraphSnapshot, GraphStore, TraversalOptions};
use crate::impact::{
    ChangeType, CostConfig, CostEstimator, FactorWeights, ImpactAnalysisResult, ScoringConfig,
    ScoringEngine,
};
use crate::metrics::{compute_metrics, GraphMetrics};
use crate::types::{AssetId, JobId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Progress checkpoint after traversal completes.
const PROGRESS_TRAVERSAL: u8 = 40;
/// Progress checkpoint after metrics complete.
const PROGRESS_METRICS: u8 = 70;
/// Progress at completion.
const PROGRESS_DONE: u8 = 100;

/// Job manager configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Capacity of the job event broadcast channel.
    pub event_capacity: usize,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self { event_capacity: 128 }
    }
}

/// An impact-analysis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Asset the proposed change applies to.
    pub source_asset_id: AssetId,
    /// Kind of change.
    pub change_type: ChangeType,
    /// Requested traversal direction.
    pub direction: Direction,
    /// Depth bound in hops; 0 means unlimited.
    pub max_depth: usize,
    /// Restrict the walk to the upstream side.
    pub include_upstream: bool,
    /// Restrict the walk to the downstream side.
    pub include_downstream: bool,
    /// Compute graph metrics as part of the job.
    pub include_metrics: bool,
    /// Compute cost/ROI figures as part of the job.
    pub include_cost: bool,
    /// Factor weight override for this run.
    pub weights: Option<FactorWeights>,
}

impl AnalysisRequest {
    /// Creates a downstream, unlimited-depth request with metrics and cost
    /// included.
    pub fn new(source_asset_id: &str, change_type: ChangeType) -> Self {
        Self {
            source_asset_id: source_asset_id.to_string(),
            change_type,
            direction: Direction::Downstream,
            max_depth: 0,
            include_upstream: false,
            include_downstream: true,
            include_metrics: true,
            include_cost: true,
            weights: None,
        }
    }

    /// Sets direction
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        match direction {
            Direction::Upstream => {
                self.include_upstream = true;
                self.include_downstream = false;
            }
            Direction::Downstream => {
                self.include_upstream = false;
                self.include_downstream = true;
            }
            Direction::Both => {
                self.include_upstream = true;
                self.include_downstream = true;
            }
        }
        self
    }

    /// Sets depth bound
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Overrides factor weights
    pub fn with_weights(mut self, weights: FactorWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Skips the metrics stage
    pub fn without_metrics(mut self) -> Self {
        self.include_metrics = false;
        self
    }

    /// Skips the cost stage
    pub fn without_cost(mut self) -> Self {
        self.include_cost = false;
        self
    }

    /// The direction the traversal actually uses: the inclusion flags
    /// restrict the requested direction; with both flags clear the stated
    /// direction stands.
    pub fn effective_direction(&self) -> Direction {
        match (self.include_upstream, self.include_downstream) {
            (true, false) => Direction::Upstream,
            (false, true) => Direction::Downstream,
            (true, true) => self.direction,
            (false, false) => self.direction,
        }
    }
}

/// Job lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Submitted, not yet scheduled.
    Pending,
    /// Executing.
    Running,
    /// Finished with a result.
    Completed,
    /// Finished with an error cause.
    Failed,
    /// Cancelled by a caller.
    Cancelled,
}

impl JobStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// Structured cause of a failed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobError {
    /// Pipeline stage the failure occurred in.
    pub stage: String,
    /// Error message, including the cause chain.
    pub message: String,
}

/// Result payload of a completed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Scored impact set with recommendations and cost figures.
    pub impact: ImpactAnalysisResult,
    /// Graph metrics, when requested.
    pub metrics: Option<GraphMetrics>,
}

/// A tracked analysis job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisJob {
    /// Job ID.
    pub id: JobId,
    /// Current state.
    pub status: JobStatus,
    /// The request that created the job.
    pub request: AnalysisRequest,
    /// Progress in percent.
    pub progress_percentage: u8,
    /// Result, present once completed.
    pub result: Option<AnalysisReport>,
    /// Failure cause, present once failed.
    pub error: Option<JobError>,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Execution start time.
    pub started_at: Option<DateTime<Utc>>,
    /// Terminal transition time.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Snapshot of a job's externally visible state, returned by `poll`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusReport {
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress_percentage: u8,
    pub result: Option<AnalysisReport>,
    pub error: Option<JobError>,
}

/// A job lifecycle event.
#[derive(Debug, Clone)]
pub enum JobEvent {
    /// Job was submitted.
    Submitted { job_id: JobId },
    /// Job started executing.
    Started { job_id: JobId, at: DateTime<Utc> },
    /// Job reported progress.
    Progress { job_id: JobId, progress: u8 },
    /// Job completed.
    Completed { job_id: JobId, at: DateTime<Utc> },
    /// Job failed.
    Failed { job_id: JobId, error: JobError, at: DateTime<Utc> },
    /// Job was cancelled.
    Cancelled { job_id: JobId, at: DateTime<Utc> },
}

/// Orchestrates impact-analysis jobs over store snapshots.
pub struct AnalysisJobManager {
    store: Arc<GraphStore>,
    scoring_config: ScoringConfig,
    cost_config: CostConfig,
    jobs: Arc<RwLock<HashMap<JobId, AnalysisJob>>>,
    cancel_flags: Arc<RwLock<HashMap<JobId, Arc<AtomicBool>>>>,
    event_tx: broadcast::Sender<JobEvent>,
}

impl AnalysisJobManager {
    /// Creates a manager over a store with default scoring and cost
    /// configuration.
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self::with_config(
            store,
            JobsConfig::default(),
            ScoringConfig::default(),
            CostConfig::default(),
        )
    }

    /// Creates a manager with explicit configuration.
    pub fn with_config(
        store: Arc<GraphStore>,
        jobs_config: JobsConfig,
        scoring_config: ScoringConfig,
        cost_config: CostConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(jobs_config.event_capacity.max(1));
        Self {
            store,
            scoring_config,
            cost_config,
            jobs: Arc::new(RwLock::new(HashMap::new())),
            cancel_flags: Arc::new(RwLock::new(HashMap::new())),
            event_tx,
        }
    }

    /// Subscribes to job lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.event_tx.subscribe()
    }

    /// Submits an analysis request. The snapshot is taken here, so the job
    /// is unaffected by any later store mutation. Fails fast with
    /// `NodeNotFound` when the source asset does not exist and
    /// `InvalidWeights` when a supplied override does not sum to 1.0.
    pub async fn submit(&self, request: AnalysisRequest) -> Result<JobId> {
        if let Some(weights) = &request.weights {
            weights.validate()?;
        }

        let snapshot = self.store.snapshot().await;
        if !snapshot.contains_node(&request.source_asset_id) {
            return Err(TrellisError::NodeNotFound(request.source_asset_id));
        }

        let job_id = Uuid::new_v4().to_string();
        let cancel = Arc::new(AtomicBool::new(false));
        let job = AnalysisJob {
            id: job_id.clone(),
            status: JobStatus::Pending,
            request: request.clone(),
            progress_percentage: 0,
            result: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };

        self.jobs.write().await.insert(job_id.clone(), job);
        self.cancel_flags
            .write()
            .await
            .insert(job_id.clone(), cancel.clone());

        info!(
            job_id = %job_id,
            source = %request.source_asset_id,
            change_type = ?request.change_type,
            direction = ?request.effective_direction(),
            "Submitted analysis job"
        );
        let _ = self.event_tx.send(JobEvent::Submitted { job_id: job_id.clone() });

        let worker = JobWorker {
            jobs: self.jobs.clone(),
            event_tx: self.event_tx.clone(),
            scoring_config: self.scoring_config.clone(),
            cost_config: self.cost_config.clone(),
        };
        let task_job_id = job_id.clone();
        tokio::spawn(async move {
            worker.run(task_job_id, request, snapshot, cancel).await;
        });

        Ok(job_id)
    }

    /// Polls a job's status. Fails with `JobNotFound` for unknown ids.
    pub async fn poll(&self, job_id: &str) -> Result<JobStatusReport> {
        let jobs = self.jobs.read().await;
        let job = jobs
            .get(job_id)
            .ok_or_else(|| TrellisError::JobNotFound(job_id.to_string()))?;
        Ok(JobStatusReport {
            job_id: job.id.clone(),
            status: job.status,
            progress_percentage: job.progress_percentage,
            result: job.result.clone(),
            error: job.error.clone(),
        })
    }

    /// Cancels a job. Valid from `PENDING`/`RUNNING`; a warning no-op on
    /// jobs already terminal. Returns whether a cancellation took effect.
    pub async fn cancel(&self, job_id: &str) -> Result<bool> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| TrellisError::JobNotFound(job_id.to_string()))?;

        if job.status.is_terminal() {
            warn!(job_id, status = ?job.status, "Cancel requested on terminal job; ignoring");
            return Ok(false);
        }

        job.status = JobStatus::Cancelled;
        job.completed_at = Some(Utc::now());
        drop(jobs);

        if let Some(flag) = self.cancel_flags.read().await.get(job_id) {
            flag.store(true, Ordering::Relaxed);
        }

        info!(job_id, "Cancelled analysis job");
        let _ = self.event_tx.send(JobEvent::Cancelled {
            job_id: job_id.to_string(),
            at: Utc::now(),
        });
        Ok(true)
    }

    /// Lists all tracked jobs.
    pub async fn list_jobs(&self) -> Vec<AnalysisJob> {
        self.jobs.read().await.values().cloned().collect()
    }

    /// Gets one job by id.
    pub async fn get_job(&self, job_id: &str) -> Option<AnalysisJob> {
        self.jobs.read().await.get(job_id).cloned()
    }
}

/// The pieces of manager state a spawned job needs.
struct JobWorker {
    jobs: Arc<RwLock<HashMap<JobId, AnalysisJob>>>,
    event_tx: broadcast::Sender<JobEvent>,
    scoring_config: ScoringConfig,
    cost_config: CostConfig,
}

impl JobWorker {
    async fn run(
        &self,
        job_id: JobId,
        request: AnalysisRequest,
        snapshot: GraphSnapshot,
        cancel: Arc<AtomicBool>,
    ) {
        if !self.mark_running(&job_id).await {
            // Cancelled before it ever ran.
            return;
        }

        match self.execute(&job_id, &request, &snapshot, &cancel).await {
            Ok(report) => self.mark_completed(&job_id, report).await,
            Err(TrellisError::Cancelled(stage)) => {
                info!(job_id = %job_id, stage, "Job observed cancellation");
                // The cancel() call already moved the job to CANCELLED.
            }
            Err(err) => self.mark_failed(&job_id, err).await,
        }
    }

    async fn execute(
        &self,
        job_id: &str,
        request: &AnalysisRequest,
        snapshot: &GraphSnapshot,
        cancel: &AtomicBool,
    ) -> Result<AnalysisReport> {
        // Stage 1: traversal.
        let options = TraversalOptions {
            direction: request.effective_direction(),
            max_depth: request.max_depth,
            edge_kinds: None,
            node_kinds: None,
        };
        let traversal =
            traverse_cancellable(snapshot, &request.source_asset_id, &options, Some(cancel))
                .map_err(|e| stage_error("traversal", e))?;
        self.report_progress(job_id, PROGRESS_TRAVERSAL).await;

        // Stage 2: metrics.
        let metrics = if request.include_metrics {
            Some(
                compute_metrics(snapshot, Some(cancel))
                    .map_err(|e| stage_error("metrics", e))?,
            )
        } else {
            None
        };
        self.report_progress(job_id, PROGRESS_METRICS).await;

        // Stage 3: scoring and cost.
        let engine = ScoringEngine::new(self.scoring_config.clone());
        let mut impact = engine
            .score(snapshot, &traversal, request.change_type, request.weights)
            .map_err(|e| stage_error("scoring", e))?;

        if let Some(m) = &metrics {
            if !m.eigenvector.converged {
                impact
                    .warnings
                    .push("eigenvector centrality did not converge; scores are a last iterate".to_string());
            }
        }

        if request.include_cost {
            let estimator =
                CostEstimator::new(self.cost_config.clone()).map_err(|e| stage_error("cost", e))?;
            let estimate = estimator
                .estimate(snapshot, &impact)
                .map_err(|e| stage_error("cost", e))?;
            impact.cost = Some(estimate);
        }

        Ok(AnalysisReport { impact, metrics })
    }

    /// Transitions PENDING -> RUNNING. Returns false if the job is already
    /// terminal (cancelled before scheduling).
    async fn mark_running(&self, job_id: &str) -> bool {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(job_id) else {
            return false;
        };
        if job.status != JobStatus::Pending {
            return false;
        }
        job.status = JobStatus::Running;
        job.started_at = Some(Utc::now());
        drop(jobs);

        info!(job_id, "Analysis job running");
        let _ = self.event_tx.send(JobEvent::Started {
            job_id: job_id.to_string(),
            at: Utc::now(),
        });
        true
    }

    async fn report_progress(&self, job_id: &str, progress: u8) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(job_id) {
            // Terminal jobs (concurrent cancellation) keep their state.
            if !job.status.is_terminal() {
                job.progress_percentage = progress;
                let _ = self.event_tx.send(JobEvent::Progress {
                    job_id: job_id.to_string(),
                    progress,
                });
            }
        }
    }

    async fn mark_completed(&self, job_id: &str, report: AnalysisReport) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(job_id) {
            // A cancelled job never later reports COMPLETED.
            if job.status != JobStatus::Running {
                return;
            }
            job.status = JobStatus::Completed;
            job.progress_percentage = PROGRESS_DONE;
            job.result = Some(report);
            job.completed_at = Some(Utc::now());
        }
        drop(jobs);

        info!(job_id, "Analysis job completed");
        let _ = self.event_tx.send(JobEvent::Completed {
            job_id: job_id.to_string(),
            at: Utc::now(),
        });
    }

    async fn mark_failed(&self, job_id: &str, err: TrellisError) {
        let job_error = match &err {
            TrellisError::InternalAnalysisFailure { stage, source } => JobError {
                stage: stage.clone(),
                message: source.to_string(),
            },
            other => JobError {
                stage: "analysis".to_string(),
                message: other.to_string(),
            },
        };

        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(job_id) {
            if job.status != JobStatus::Running {
                return;
            }
            job.status = JobStatus::Failed;
            job.error = Some(job_error.clone());
            job.completed_at = Some(Utc::now());
        }
        drop(jobs);

        error!(job_id, stage = %job_error.stage, error = %job_error.message, "Analysis job failed");
        let _ = self.event_tx.send(JobEvent::Failed {
            job_id: job_id.to_string(),
            error: job_error,
            at: Utc::now(),
        });
    }
}

fn stage_error(stage: &str, err: TrellisError) -> TrellisError {
    match err {
        // Cancellation is a lifecycle transition, not a failure.
        TrellisError::Cancelled(_) => err,
        other => TrellisError::analysis_failure(stage, other),
    }
}
