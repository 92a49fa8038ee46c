// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Job orchestrator: sequences the steps of one run.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use rota_server_db::AppointmentStore;

use crate::listener::RunListener;
use crate::processor::MarkMissedProcessor;
use crate::reader::OverdueAppointmentReader;
use crate::step::{ChunkedStep, Step, StepContext, TaskletStep, DEFAULT_CHUNK_SIZE};
use crate::tasklet::StatusReportTasklet;
use crate::types::{JobRun, RunParameters, RunStatus, StepStatus};
use crate::writer::StoreChunkWriter;

/// Sequences an ordered list of steps as one run.
///
/// The run's state machine is `Starting → Started → (Completed |
/// Failed)`. Steps execute strictly sequentially; the first failed step
/// fails the run and skips the remainder. The listener's after-run hook
/// fires exactly once per run, on every terminal path.
pub struct JobOrchestrator {
	name: String,
	steps: Vec<Box<dyn Step>>,
	listener: Arc<dyn RunListener>,
}

impl JobOrchestrator {
	pub fn new(name: &str, listener: Arc<dyn RunListener>) -> Self {
		Self {
			name: name.to_string(),
			steps: Vec::new(),
			listener,
		}
	}

	pub fn add_step(&mut self, step: Box<dyn Step>) {
		self.steps.push(step);
	}

	/// The standard missed-appointment reconciliation job: a chunked
	/// mark-overdue step followed by the status-report tasklet.
	pub fn reconciliation(
		store: Arc<dyn AppointmentStore>,
		listener: Arc<dyn RunListener>,
		chunk_size: usize,
	) -> Self {
		let mut orchestrator = Self::new("missed-appointments", listener);
		orchestrator.add_step(Box::new(ChunkedStep::new(
			"mark-overdue-missed",
			Box::new(OverdueAppointmentReader::new(Arc::clone(&store))),
			Box::new(MarkMissedProcessor),
			Box::new(StoreChunkWriter::new(Arc::clone(&store))),
			chunk_size,
		)));
		orchestrator.add_step(Box::new(TaskletStep::new(
			"status-report",
			Box::new(StatusReportTasklet::new(store)),
		)));
		orchestrator
	}

	/// Same as [`JobOrchestrator::reconciliation`] with the default
	/// chunk size.
	pub fn reconciliation_with_defaults(
		store: Arc<dyn AppointmentStore>,
		listener: Arc<dyn RunListener>,
	) -> Self {
		Self::reconciliation(store, listener, DEFAULT_CHUNK_SIZE)
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Execute one run against the current wall clock.
	pub async fn run(&self, parameters: RunParameters) -> JobRun {
		self.run_at(parameters, Utc::now()).await
	}

	/// Execute one run with an injected clock.
	///
	/// `now` is sampled exactly once here and threaded through the step
	/// context, keeping eligibility decisions stable across the scan.
	#[instrument(skip(self), fields(job = %self.name, token = parameters.token))]
	pub async fn run_at(&self, parameters: RunParameters, now: DateTime<Utc>) -> JobRun {
		let mut run = JobRun::new(parameters, now);
		run.status = RunStatus::Started;

		self.listener.before_run(&run).await;

		let ctx = StepContext {
			run_id: run.id.clone(),
			now: now.naive_utc(),
		};

		let mut failed = false;
		for step in &self.steps {
			info!(run_id = %run.id, step = %step.name(), "Executing step");
			let execution = step.execute(&ctx, &mut run.context).await;

			let step_failed = execution.status == StepStatus::Failed;
			if let Some(error) = &execution.error {
				run.failures
					.push(format!("{}: {}", execution.step_name, error));
			}
			run.step_executions.push(execution);

			if step_failed {
				failed = true;
				break;
			}
		}

		run.status = if failed {
			RunStatus::Failed
		} else {
			RunStatus::Completed
		};
		run.ended_at = Some(Utc::now());

		if failed {
			warn!(run_id = %run.id, "Run failed");
		} else {
			info!(run_id = %run.id, "Run completed");
		}

		self.listener.after_run(&run).await;
		run
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use chrono::{NaiveDate, NaiveTime, TimeZone};
	use std::sync::atomic::{AtomicUsize, Ordering};
	use tokio::sync::Mutex;

	use rota_appointments_core::{
		Appointment, AppointmentId, AppointmentStatus, DoctorId, HospitalId,
	};
	use rota_server_db::testing::{create_appointments_table, create_test_pool};
	use rota_server_db::{AppointmentStore, DbError, SqliteAppointmentStore};

	use crate::context::{MISSED_RECORDS_KEY, TOTAL_RECORDS_KEY};
	use crate::listener::RunSummaryListener;
	use crate::types::TriggerSource;

	fn params() -> RunParameters {
		RunParameters {
			token: 1,
			source: TriggerSource::Manual,
		}
	}

	fn appointment(date: (i32, u32, u32), time: (u32, u32), status: AppointmentStatus) -> Appointment {
		Appointment {
			id: AppointmentId::new(),
			scheduled_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
			scheduled_time: NaiveTime::from_hms_opt(time.0, time.1, 0).unwrap(),
			status,
			doctor_id: DoctorId::new(),
			hospital_id: HospitalId::new(),
			referral_id: None,
		}
	}

	async fn setup_store() -> Arc<SqliteAppointmentStore> {
		let pool = create_test_pool().await;
		create_appointments_table(&pool).await;
		Arc::new(SqliteAppointmentStore::new(pool))
	}

	fn run_clock() -> DateTime<Utc> {
		// "now" = 2026-03-14 09:00:00.
		Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap()
	}

	/// Wraps a real store and fails a chosen save_chunk call; every
	/// other operation delegates.
	struct FailingChunkStore {
		inner: Arc<SqliteAppointmentStore>,
		fail_on_chunk: usize,
		chunk_calls: AtomicUsize,
	}

	#[async_trait]
	impl AppointmentStore for FailingChunkStore {
		async fn find_by_status(
			&self,
			status: AppointmentStatus,
		) -> rota_server_db::Result<Vec<Appointment>> {
			self.inner.find_by_status(status).await
		}

		async fn find_by_id(
			&self,
			id: AppointmentId,
		) -> rota_server_db::Result<Option<Appointment>> {
			self.inner.find_by_id(id).await
		}

		async fn count(&self) -> rota_server_db::Result<i64> {
			self.inner.count().await
		}

		async fn count_by_status(&self, status: AppointmentStatus) -> rota_server_db::Result<i64> {
			self.inner.count_by_status(status).await
		}

		async fn save(&self, appointment: &Appointment) -> rota_server_db::Result<()> {
			self.inner.save(appointment).await
		}

		async fn save_chunk(&self, appointments: &[Appointment]) -> rota_server_db::Result<()> {
			let call = self.chunk_calls.fetch_add(1, Ordering::SeqCst) + 1;
			if call == self.fail_on_chunk {
				return Err(DbError::Internal(format!("chunk {call} rejected")));
			}
			self.inner.save_chunk(appointments).await
		}
	}

	/// Fails every count, so only the aggregation step breaks.
	struct FailingCountStore {
		inner: Arc<SqliteAppointmentStore>,
	}

	#[async_trait]
	impl AppointmentStore for FailingCountStore {
		async fn find_by_status(
			&self,
			status: AppointmentStatus,
		) -> rota_server_db::Result<Vec<Appointment>> {
			self.inner.find_by_status(status).await
		}

		async fn find_by_id(
			&self,
			id: AppointmentId,
		) -> rota_server_db::Result<Option<Appointment>> {
			self.inner.find_by_id(id).await
		}

		async fn count(&self) -> rota_server_db::Result<i64> {
			Err(DbError::Internal("count unavailable".to_string()))
		}

		async fn count_by_status(&self, _status: AppointmentStatus) -> rota_server_db::Result<i64> {
			Err(DbError::Internal("count unavailable".to_string()))
		}

		async fn save(&self, appointment: &Appointment) -> rota_server_db::Result<()> {
			self.inner.save(appointment).await
		}

		async fn save_chunk(&self, appointments: &[Appointment]) -> rota_server_db::Result<()> {
			self.inner.save_chunk(appointments).await
		}
	}

	/// Records the order and terminal status of listener invocations.
	#[derive(Default)]
	struct RecordingListener {
		events: Mutex<Vec<String>>,
	}

	#[async_trait]
	impl RunListener for RecordingListener {
		async fn before_run(&self, run: &JobRun) {
			self.events
				.lock()
				.await
				.push(format!("before:{}", run.status));
		}

		async fn after_run(&self, run: &JobRun) {
			self.events
				.lock()
				.await
				.push(format!("after:{}", run.status));
		}
	}

	#[tokio::test]
	async fn test_scenario_a_three_appointments() {
		let store = setup_store().await;
		let yesterday = appointment((2026, 3, 13), (10, 0), AppointmentStatus::Scheduled);
		let today_early = appointment((2026, 3, 14), (8, 0), AppointmentStatus::Scheduled);
		let tomorrow = appointment((2026, 3, 15), (8, 0), AppointmentStatus::Scheduled);
		for a in [&yesterday, &today_early, &tomorrow] {
			store.save(a).await.unwrap();
		}

		let orchestrator = JobOrchestrator::reconciliation_with_defaults(
			Arc::clone(&store) as Arc<dyn AppointmentStore>,
			Arc::new(RunSummaryListener::new()),
		);
		let run = orchestrator.run_at(params(), run_clock()).await;

		assert_eq!(run.status, RunStatus::Completed);
		assert_eq!(
			store.find_by_id(yesterday.id).await.unwrap().unwrap().status,
			AppointmentStatus::Missed
		);
		assert_eq!(
			store
				.find_by_id(today_early.id)
				.await
				.unwrap()
				.unwrap()
				.status,
			AppointmentStatus::Missed
		);
		assert_eq!(
			store.find_by_id(tomorrow.id).await.unwrap().unwrap().status,
			AppointmentStatus::Scheduled
		);
		assert_eq!(run.context.get_i64(MISSED_RECORDS_KEY), Some(2));
		assert_eq!(run.context.get_i64(TOTAL_RECORDS_KEY), Some(3));
	}

	#[tokio::test]
	async fn test_scenario_b_25_eligible_records_three_chunks() {
		let store = setup_store().await;
		for i in 0..25 {
			let mut a = appointment((2026, 3, 13), (8, 0), AppointmentStatus::Scheduled);
			a.scheduled_time = NaiveTime::from_hms_opt(8, i, 0).unwrap();
			store.save(&a).await.unwrap();
		}

		let orchestrator = JobOrchestrator::reconciliation(
			Arc::clone(&store) as Arc<dyn AppointmentStore>,
			Arc::new(RunSummaryListener::new()),
			10,
		);
		let run = orchestrator.run_at(params(), run_clock()).await;

		assert_eq!(run.status, RunStatus::Completed);
		let chunked = &run.step_executions[0];
		assert_eq!(chunked.read_count, 25);
		assert_eq!(chunked.write_count, 25);
		assert_eq!(
			store
				.count_by_status(AppointmentStatus::Missed)
				.await
				.unwrap(),
			25
		);
		assert_eq!(run.context.get_i64(MISSED_RECORDS_KEY), Some(25));
	}

	#[tokio::test]
	async fn test_scenario_c_second_chunk_fails() {
		let inner = setup_store().await;
		for i in 0..25 {
			let mut a = appointment((2026, 3, 13), (8, 0), AppointmentStatus::Scheduled);
			a.scheduled_time = NaiveTime::from_hms_opt(8, i, 0).unwrap();
			inner.save(&a).await.unwrap();
		}
		let store = Arc::new(FailingChunkStore {
			inner: Arc::clone(&inner),
			fail_on_chunk: 2,
			chunk_calls: AtomicUsize::new(0),
		});

		let orchestrator = JobOrchestrator::reconciliation(
			store as Arc<dyn AppointmentStore>,
			Arc::new(RunSummaryListener::new()),
			10,
		);
		let run = orchestrator.run_at(params(), run_clock()).await;

		assert_eq!(run.status, RunStatus::Failed);
		// First chunk stays committed; the rest were never written.
		assert_eq!(
			inner
				.count_by_status(AppointmentStatus::Missed)
				.await
				.unwrap(),
			10
		);
		assert_eq!(
			inner
				.count_by_status(AppointmentStatus::Scheduled)
				.await
				.unwrap(),
			15
		);
		assert_eq!(run.failures.len(), 1);
		assert!(run.failures[0].contains("chunk 2 rejected"));
		// Aggregation never ran.
		assert_eq!(run.step_executions.len(), 1);
		assert!(run.context.is_empty());
	}

	#[tokio::test]
	async fn test_aggregation_failure_keeps_committed_transitions() {
		let inner = setup_store().await;
		let overdue = appointment((2026, 3, 13), (10, 0), AppointmentStatus::Scheduled);
		inner.save(&overdue).await.unwrap();
		let store = Arc::new(FailingCountStore {
			inner: Arc::clone(&inner),
		});

		let orchestrator = JobOrchestrator::reconciliation_with_defaults(
			store as Arc<dyn AppointmentStore>,
			Arc::new(RunSummaryListener::new()),
		);
		let run = orchestrator.run_at(params(), run_clock()).await;

		// The run reports failure even though the transition committed.
		assert_eq!(run.status, RunStatus::Failed);
		assert_eq!(
			inner.find_by_id(overdue.id).await.unwrap().unwrap().status,
			AppointmentStatus::Missed
		);
		assert_eq!(run.step_executions.len(), 2);
		assert_eq!(run.step_executions[0].status, StepStatus::Completed);
		assert_eq!(run.step_executions[1].status, StepStatus::Failed);
	}

	#[tokio::test]
	async fn test_non_scheduled_records_are_untouched() {
		let store = setup_store().await;
		let open = appointment((2026, 3, 13), (10, 0), AppointmentStatus::Open);
		let finished = appointment((2026, 3, 13), (10, 0), AppointmentStatus::Finished);
		store.save(&open).await.unwrap();
		store.save(&finished).await.unwrap();

		let orchestrator = JobOrchestrator::reconciliation_with_defaults(
			Arc::clone(&store) as Arc<dyn AppointmentStore>,
			Arc::new(RunSummaryListener::new()),
		);
		let run = orchestrator.run_at(params(), run_clock()).await;

		assert_eq!(run.status, RunStatus::Completed);
		assert_eq!(run.step_executions[0].read_count, 0);
		assert_eq!(
			store.find_by_id(open.id).await.unwrap().unwrap().status,
			AppointmentStatus::Open
		);
		assert_eq!(
			store.find_by_id(finished.id).await.unwrap().unwrap().status,
			AppointmentStatus::Finished
		);
	}

	#[tokio::test]
	async fn test_listener_fires_before_and_after_exactly_once() {
		let store = setup_store().await;
		let listener = Arc::new(RecordingListener::default());

		let orchestrator = JobOrchestrator::reconciliation_with_defaults(
			Arc::clone(&store) as Arc<dyn AppointmentStore>,
			Arc::clone(&listener) as Arc<dyn RunListener>,
		);
		orchestrator.run_at(params(), run_clock()).await;

		let events = listener.events.lock().await.clone();
		assert_eq!(events, vec!["before:started", "after:completed"]);
	}

	#[tokio::test]
	async fn test_listener_sees_failed_terminal_state_once() {
		let inner = setup_store().await;
		inner
			.save(&appointment((2026, 3, 13), (10, 0), AppointmentStatus::Scheduled))
			.await
			.unwrap();
		let store = Arc::new(FailingChunkStore {
			inner,
			fail_on_chunk: 1,
			chunk_calls: AtomicUsize::new(0),
		});
		let listener = Arc::new(RecordingListener::default());

		let orchestrator = JobOrchestrator::reconciliation_with_defaults(
			store as Arc<dyn AppointmentStore>,
			Arc::clone(&listener) as Arc<dyn RunListener>,
		);
		let run = orchestrator.run_at(params(), run_clock()).await;

		assert_eq!(run.status, RunStatus::Failed);
		let events = listener.events.lock().await.clone();
		assert_eq!(events, vec!["before:started", "after:failed"]);
	}

	#[tokio::test]
	async fn test_two_consecutive_runs_reuse_the_orchestrator() {
		let store = setup_store().await;
		let first = appointment((2026, 3, 13), (10, 0), AppointmentStatus::Scheduled);
		store.save(&first).await.unwrap();

		let orchestrator = JobOrchestrator::reconciliation_with_defaults(
			Arc::clone(&store) as Arc<dyn AppointmentStore>,
			Arc::new(RunSummaryListener::new()),
		);

		let run_one = orchestrator.run_at(params(), run_clock()).await;
		assert_eq!(run_one.status, RunStatus::Completed);
		assert_eq!(run_one.step_executions[0].write_count, 1);

		// Second run on the same instance: nothing left to reconcile.
		let run_two = orchestrator
			.run_at(
				RunParameters {
					token: 2,
					source: TriggerSource::Manual,
				},
				run_clock(),
			)
			.await;
		assert_eq!(run_two.status, RunStatus::Completed);
		assert_eq!(run_two.step_executions[0].read_count, 0);
		assert_ne!(run_one.id, run_two.id);
	}
}
