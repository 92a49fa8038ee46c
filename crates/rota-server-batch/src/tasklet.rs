// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Aggregation tasklet: per-status counts after the chunked step.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use rota_appointments_core::AppointmentStatus;
use rota_server_db::AppointmentStore;

use crate::context::{ExecutionContext, MISSED_RECORDS_KEY, TOTAL_RECORDS_KEY};
use crate::error::Result;
use crate::step::{StepContext, Tasklet};

/// Computes fresh counts over the whole store and publishes the total
/// and missed counts into the run's execution context.
///
/// Counts are re-read from the store rather than carried over from the
/// chunked step's tally, so they reflect the store's state after the
/// transitions have committed.
pub struct StatusReportTasklet {
	store: Arc<dyn AppointmentStore>,
}

impl StatusReportTasklet {
	pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
		Self { store }
	}
}

#[async_trait]
impl Tasklet for StatusReportTasklet {
	async fn execute(&self, ctx: &StepContext, execution: &mut ExecutionContext) -> Result<()> {
		let total = self.store.count().await?;

		let mut missed = 0;
		for status in AppointmentStatus::all() {
			let count = self.store.count_by_status(status).await?;
			if status == AppointmentStatus::Missed {
				missed = count;
			}
			info!(
				run_id = %ctx.run_id,
				status = %status,
				count,
				"Appointment status count"
			);
		}

		execution.put_i64(TOTAL_RECORDS_KEY, total);
		execution.put_i64(MISSED_RECORDS_KEY, missed);
		Ok(())
	}
}
