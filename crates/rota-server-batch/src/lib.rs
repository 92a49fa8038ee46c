// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Missed-appointment reconciliation pipeline for Rota server.
//!
//! A scheduled job that scans scheduled appointments, marks the ones
//! whose slot has elapsed as missed, persists the transitions in
//! fixed-size transactional chunks, and publishes aggregate counts to a
//! run listener. Runs are started by a cron trigger or manually; each
//! run carries unique parameters and its own execution context.

pub mod context;
pub mod error;
pub mod listener;
pub mod orchestrator;
pub mod processor;
pub mod reader;
pub mod step;
pub mod tasklet;
pub mod trigger;
pub mod types;
pub mod writer;

pub use context::{ExecutionContext, MISSED_RECORDS_KEY, TOTAL_RECORDS_KEY};
pub use error::{BatchError, Result};
pub use listener::{RunListener, RunSummaryListener};
pub use orchestrator::JobOrchestrator;
pub use processor::MarkMissedProcessor;
pub use reader::OverdueAppointmentReader;
pub use step::{
	ChunkedStep, ItemProcessor, ItemReader, ItemWriter, Step, StepContext, Tasklet, TaskletStep,
	DEFAULT_CHUNK_SIZE,
};
pub use tasklet::StatusReportTasklet;
pub use trigger::{CronTrigger, CronTriggerConfig, DEFAULT_CADENCE};
pub use types::{JobRun, RunParameters, RunStatus, StepExecution, StepStatus, TriggerSource};
pub use writer::StoreChunkWriter;
