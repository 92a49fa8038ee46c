// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cron-driven trigger for reconciliation runs.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{BatchError, Result};
use crate::orchestrator::JobOrchestrator;
use crate::types::{JobRun, RunParameters, RunStatus, TriggerSource};

/// Default cadence: top of every hour.
pub const DEFAULT_CADENCE: &str = "0 * * * *";

/// Convert a standard 5-field Unix cron expression to the 7-field format
/// expected by the `cron` crate.
///
/// 5-field format: minute hour day-of-month month day-of-week
/// 7-field format: second minute hour day-of-month month day-of-week year
///
/// We add "0" for seconds (fire at :00 of each minute) and "*" for year.
fn convert_to_cron_crate_format(expression: &str) -> String {
	let field_count = expression.split_whitespace().count();
	if field_count >= 6 {
		expression.to_string()
	} else if field_count == 5 {
		format!("0 {} *", expression)
	} else {
		// Invalid format, return as-is and let the parser error
		expression.to_string()
	}
}

/// Produce a strictly increasing token, unique even when two firings
/// observe the same wall clock.
fn next_token(last: &AtomicI64, now: DateTime<Utc>) -> i64 {
	let candidate = now.timestamp_millis();
	let mut prev = last.load(Ordering::SeqCst);
	loop {
		let next = candidate.max(prev + 1);
		match last.compare_exchange(prev, next, Ordering::SeqCst, Ordering::SeqCst) {
			Ok(_) => return next,
			Err(actual) => prev = actual,
		}
	}
}

fn next_fire(schedule: &Schedule, timezone: Tz, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
	let local_after = after.with_timezone(&timezone);
	schedule
		.after(&local_after)
		.next()
		.map(|next| next.with_timezone(&Utc))
}

/// Cadence configuration for the trigger.
#[derive(Debug, Clone)]
pub struct CronTriggerConfig {
	pub cadence: String,
	pub timezone: String,
}

impl Default for CronTriggerConfig {
	fn default() -> Self {
		Self {
			cadence: DEFAULT_CADENCE.to_string(),
			timezone: "UTC".to_string(),
		}
	}
}

/// Fires a reconciliation run on a fixed wall-clock cadence.
///
/// Each firing constructs uniquely-parameterized run identity and
/// spawns the run onto the runtime, so a slow run never delays the
/// next tick computation. Nothing caps concurrently in-flight runs: if
/// a run is still executing when the next cadence fires, both proceed
/// against the same store.
///
/// A failed run is logged and swallowed; the trigger never retries
/// before its next scheduled firing.
pub struct CronTrigger {
	orchestrator: Arc<JobOrchestrator>,
	schedule: Schedule,
	timezone: Tz,
	last_token: Arc<AtomicI64>,
	shutdown_tx: broadcast::Sender<()>,
	handle: Mutex<Option<JoinHandle<()>>>,
}

impl CronTrigger {
	pub fn new(orchestrator: Arc<JobOrchestrator>, config: CronTriggerConfig) -> Result<Self> {
		let cron_expr = convert_to_cron_crate_format(&config.cadence);
		let schedule = Schedule::from_str(&cron_expr)
			.map_err(|e| BatchError::InvalidCronExpression(e.to_string()))?;
		let timezone: Tz = config
			.timezone
			.parse()
			.map_err(|_| BatchError::InvalidTimezone(config.timezone.clone()))?;

		let (shutdown_tx, _) = broadcast::channel(1);
		Ok(Self {
			orchestrator,
			schedule,
			timezone,
			last_token: Arc::new(AtomicI64::new(0)),
			shutdown_tx,
			handle: Mutex::new(None),
		})
	}

	/// Next fire time strictly after `after`.
	pub fn next_fire_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
		next_fire(&self.schedule, self.timezone, after)
	}

	/// Fresh run parameters for a firing observed at `now`.
	pub fn next_parameters(&self, now: DateTime<Utc>, source: TriggerSource) -> RunParameters {
		RunParameters {
			token: next_token(&self.last_token, now),
			source,
		}
	}

	/// Launch a run outside the cadence, with its own unique identity.
	pub async fn trigger_manual(&self) -> JobRun {
		let parameters = self.next_parameters(Utc::now(), TriggerSource::Manual);
		self.orchestrator.run(parameters).await
	}

	/// Start the cadence loop.
	pub async fn start(&self) {
		let orchestrator = Arc::clone(&self.orchestrator);
		let schedule = self.schedule.clone();
		let timezone = self.timezone;
		let last_token = Arc::clone(&self.last_token);
		let mut shutdown_rx = self.shutdown_tx.subscribe();

		let task = tokio::spawn(async move {
			loop {
				let now = Utc::now();
				let Some(next) = next_fire(&schedule, timezone, now) else {
					warn!("Cron schedule yields no further fire times, stopping trigger");
					break;
				};
				let delay = (next - now)
					.to_std()
					.unwrap_or(std::time::Duration::ZERO);

				tokio::select! {
					_ = tokio::time::sleep(delay) => {
						let parameters = RunParameters {
							token: next_token(&last_token, Utc::now()),
							source: TriggerSource::Schedule,
						};
						let orchestrator = Arc::clone(&orchestrator);
						// Run on its own task so a slow run cannot
						// delay the next tick.
						tokio::spawn(async move {
							let run = orchestrator.run(parameters).await;
							if run.status == RunStatus::Failed {
								warn!(
									run_id = %run.id,
									token = run.parameters.token,
									"Scheduled reconciliation run failed"
								);
							}
						});
					}
					_ = shutdown_rx.recv() => {
						info!("Cron trigger shutting down");
						break;
					}
				}
			}
		});

		let mut handle = self.handle.lock().await;
		*handle = Some(task);
		info!(timezone = %self.timezone, "Cron trigger started");
	}

	pub async fn shutdown(&self) {
		let _ = self.shutdown_tx.send(());

		let mut handle = self.handle.lock().await;
		if let Some(task) = handle.take() {
			let _ = task.await;
		}
	}
}
