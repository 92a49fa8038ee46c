// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Chunked writer persisting transformed appointments.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use rota_appointments_core::Appointment;
use rota_server_db::AppointmentStore;

use crate::error::Result;
use crate::step::{ItemWriter, StepContext};

/// Persists each chunk through [`AppointmentStore::save_chunk`], so the
/// whole group commits as one transaction. A failed chunk fails the
/// step; earlier chunks stay committed.
pub struct StoreChunkWriter {
	store: Arc<dyn AppointmentStore>,
}

impl StoreChunkWriter {
	pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
		Self { store }
	}
}

#[async_trait]
impl ItemWriter<Appointment> for StoreChunkWriter {
	async fn write(&self, items: &[Appointment], ctx: &StepContext) -> Result<()> {
		self.store.save_chunk(items).await?;
		info!(run_id = %ctx.run_id, chunk_len = items.len(), "Chunk committed");
		Ok(())
	}
}
