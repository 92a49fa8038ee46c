// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Run completion listener.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::context::{MISSED_RECORDS_KEY, TOTAL_RECORDS_KEY};
use crate::types::{JobRun, RunStatus};

/// Observes run start and termination.
///
/// Hooks return nothing; a listener can only observe, never abort a
/// run or re-raise a failure.
#[async_trait]
pub trait RunListener: Send + Sync {
	async fn before_run(&self, run: &JobRun);
	async fn after_run(&self, run: &JobRun);
}

/// Emits a structured summary of every run through `tracing`.
///
/// On completion the aggregated counts are pulled from the run's
/// execution context; on failure every captured failure is emitted.
/// Run-scoped tracking state is dropped on every exit path.
#[derive(Default)]
pub struct RunSummaryListener {
	in_flight: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl RunSummaryListener {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of runs currently tracked between hooks.
	pub async fn in_flight_count(&self) -> usize {
		self.in_flight.lock().await.len()
	}
}

#[async_trait]
impl RunListener for RunSummaryListener {
	async fn before_run(&self, run: &JobRun) {
		self.in_flight
			.lock()
			.await
			.insert(run.id.clone(), run.started_at);

		info!(
			run_id = %run.id,
			token = run.parameters.token,
			source = %run.parameters.source.as_str(),
			"Reconciliation run starting"
		);
	}

	async fn after_run(&self, run: &JobRun) {
		// Cleanup happens before any reporting so no path can leak
		// tracking state.
		let started_at = self.in_flight.lock().await.remove(&run.id);

		let duration_ms = run.duration_ms().or_else(|| {
			started_at.map(|started| (Utc::now() - started).num_milliseconds())
		});

		match run.status {
			RunStatus::Completed => {
				let total = run.context.get_i64(TOTAL_RECORDS_KEY).unwrap_or(0);
				let missed = run.context.get_i64(MISSED_RECORDS_KEY).unwrap_or(0);
				info!(
					run_id = %run.id,
					duration_ms,
					total_records = total,
					missed_records = missed,
					"Reconciliation run completed"
				);
			}
			RunStatus::Failed => {
				for failure in &run.failures {
					warn!(run_id = %run.id, error = %failure, "Reconciliation step failed");
				}
				warn!(
					run_id = %run.id,
					duration_ms,
					failure_count = run.failures.len(),
					"Reconciliation run failed"
				);
			}
			status => {
				warn!(run_id = %run.id, status = %status, "Run ended in a non-terminal status");
			}
		}
	}
}
