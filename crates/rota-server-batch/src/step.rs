// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Step abstractions and the chunk-oriented step driver.
//!
//! A run is composed of an ordered list of [`Step`] values. The two
//! shapes a step can take are [`ChunkedStep`] (read → transform →
//! write in fixed-size groups) and [`TaskletStep`] (a single-shot
//! operation). Readers, processors and writers are interchangeable
//! trait implementations, so the orchestrator composes over trait
//! objects rather than concrete pipelines.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tracing::{info, warn};

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::types::StepExecution;

/// Default number of records committed per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Run-scoped data handed to every step.
///
/// `now` is sampled once when the run starts and reused for the whole
/// run, so time-based decisions cannot shift mid-scan.
#[derive(Debug, Clone)]
pub struct StepContext {
	pub run_id: String,
	pub now: NaiveDateTime,
}

/// Produces items one at a time; `Ok(None)` signals exhaustion.
///
/// A reader is re-armed after signalling exhaustion so the same
/// instance can serve the next run.
#[async_trait]
pub trait ItemReader<T>: Send + Sync {
	async fn read(&self, ctx: &StepContext) -> Result<Option<T>>;
}

/// Pure per-item mapping between read and write. Must not perform I/O.
pub trait ItemProcessor<I, O>: Send + Sync {
	fn process(&self, item: I) -> O;
}

/// Persists one chunk of items as a single unit.
#[async_trait]
pub trait ItemWriter<T>: Send + Sync {
	async fn write(&self, items: &[T], ctx: &StepContext) -> Result<()>;
}

/// A single-shot, non-chunked operation.
#[async_trait]
pub trait Tasklet: Send + Sync {
	async fn execute(&self, ctx: &StepContext, execution: &mut ExecutionContext) -> Result<()>;
}

/// One stage of a run. Failures are captured on the returned
/// [`StepExecution`] rather than raised, so the orchestrator can record
/// partial progress before failing the run.
#[async_trait]
pub trait Step: Send + Sync {
	fn name(&self) -> &str;
	async fn execute(&self, ctx: &StepContext, execution: &mut ExecutionContext) -> StepExecution;
}

/// Chunk-oriented step: drain the reader through the processor,
/// committing every `chunk_size` items as one writer call.
///
/// A writer failure stops the step immediately; chunks already written
/// stay written, and nothing further is read.
pub struct ChunkedStep<T> {
	name: String,
	reader: Box<dyn ItemReader<T>>,
	processor: Box<dyn ItemProcessor<T, T>>,
	writer: Box<dyn ItemWriter<T>>,
	chunk_size: usize,
}

impl<T> ChunkedStep<T> {
	pub fn new(
		name: &str,
		reader: Box<dyn ItemReader<T>>,
		processor: Box<dyn ItemProcessor<T, T>>,
		writer: Box<dyn ItemWriter<T>>,
		chunk_size: usize,
	) -> Self {
		Self {
			name: name.to_string(),
			reader,
			processor,
			writer,
			chunk_size: chunk_size.max(1),
		}
	}
}

#[async_trait]
impl<T: Send + Sync> Step for ChunkedStep<T> {
	fn name(&self) -> &str {
		&self.name
	}

	async fn execute(&self, ctx: &StepContext, _execution: &mut ExecutionContext) -> StepExecution {
		let mut execution = StepExecution::new(&self.name);

		loop {
			let mut chunk = Vec::with_capacity(self.chunk_size);
			while chunk.len() < self.chunk_size {
				match self.reader.read(ctx).await {
					Ok(Some(item)) => {
						execution.read_count += 1;
						chunk.push(self.processor.process(item));
					}
					Ok(None) => break,
					Err(e) => {
						warn!(run_id = %ctx.run_id, step = %self.name, error = %e, "Read failed");
						execution.fail(e.to_string());
						return execution;
					}
				}
			}

			if chunk.is_empty() {
				break;
			}

			let chunk_full = chunk.len() == self.chunk_size;
			match self.writer.write(&chunk, ctx).await {
				Ok(()) => execution.write_count += chunk.len() as u64,
				Err(e) => {
					warn!(run_id = %ctx.run_id, step = %self.name, error = %e, "Chunk write failed");
					execution.fail(e.to_string());
					return execution;
				}
			}

			if !chunk_full {
				break;
			}
		}

		info!(
			run_id = %ctx.run_id,
			step = %self.name,
			read_count = execution.read_count,
			write_count = execution.write_count,
			"Chunked step completed"
		);
		execution
	}
}

/// Adapter running a [`Tasklet`] as a step.
pub struct TaskletStep {
	name: String,
	tasklet: Box<dyn Tasklet>,
}

impl TaskletStep {
	pub fn new(name: &str, tasklet: Box<dyn Tasklet>) -> Self {
		Self {
			name: name.to_string(),
			tasklet,
		}
	}
}

#[async_trait]
impl Step for TaskletStep {
	fn name(&self) -> &str {
		&self.name
	}

	async fn execute(&self, ctx: &StepContext, execution_ctx: &mut ExecutionContext) -> StepExecution {
		let mut execution = StepExecution::new(&self.name);

		match self.tasklet.execute(ctx, execution_ctx).await {
			Ok(()) => {
				info!(run_id = %ctx.run_id, step = %self.name, "Tasklet completed");
			}
			Err(e) => {
				warn!(run_id = %ctx.run_id, step = %self.name, error = %e, "Tasklet failed");
				execution.fail(e.to_string());
			}
		}

		execution
	}
}
