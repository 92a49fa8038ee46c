// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Snapshot reader for overdue scheduled appointments.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use rota_appointments_core::{is_overdue, Appointment, AppointmentStatus};
use rota_server_db::AppointmentStore;

use crate::error::Result;
use crate::step::{ItemReader, StepContext};

/// Forward-only, single-pass reader over the overdue appointments of
/// one run.
///
/// The first `read` of a run issues one query for all `Scheduled`
/// appointments, filters them in memory against the run's captured
/// "now", and snapshots the result. Subsequent reads drain the
/// snapshot; after exhaustion the reader re-arms itself so the same
/// instance can serve the next run.
///
/// The eligible set is fixed at read time. An appointment changed by a
/// concurrent process between the read and the write is not re-checked
/// before writing.
pub struct OverdueAppointmentReader {
	store: Arc<dyn AppointmentStore>,
	snapshot: Mutex<Option<VecDeque<Appointment>>>,
}

impl OverdueAppointmentReader {
	pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
		Self {
			store,
			snapshot: Mutex::new(None),
		}
	}
}

#[async_trait]
impl ItemReader<Appointment> for OverdueAppointmentReader {
	async fn read(&self, ctx: &StepContext) -> Result<Option<Appointment>> {
		let mut guard = self.snapshot.lock().await;

		if guard.is_none() {
			let scheduled = self
				.store
				.find_by_status(AppointmentStatus::Scheduled)
				.await?;
			let scheduled_count = scheduled.len();

			let overdue: VecDeque<Appointment> = scheduled
				.into_iter()
				.filter(|appointment| is_overdue(appointment, ctx.now))
				.collect();

			info!(
				run_id = %ctx.run_id,
				scheduled_count,
				overdue_count = overdue.len(),
				"Snapshot of overdue appointments taken"
			);
			*guard = Some(overdue);
		}

		let Some(snapshot) = guard.as_mut() else {
			return Ok(None);
		};

		match snapshot.pop_front() {
			Some(appointment) => Ok(Some(appointment)),
			None => {
				// Re-arm for the next run.
				*guard = None;
				Ok(None)
			}
		}
	}
}
