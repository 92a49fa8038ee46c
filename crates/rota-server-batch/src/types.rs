// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Run and step lifecycle types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::ExecutionContext;

/// Lifecycle status of a run.
///
/// Transitions are `Starting → Started → (Completed | Failed)`; the two
/// terminal states invoke the listener's after-run hook exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
	Starting,
	Started,
	Completed,
	Failed,
}

impl RunStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			RunStatus::Starting => "starting",
			RunStatus::Started => "started",
			RunStatus::Completed => "completed",
			RunStatus::Failed => "failed",
		}
	}

	pub fn is_terminal(&self) -> bool {
		matches!(self, RunStatus::Completed | RunStatus::Failed)
	}
}

impl std::fmt::Display for RunStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// What caused a run to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
	Schedule,
	Manual,
}

impl TriggerSource {
	pub fn as_str(&self) -> &'static str {
		match self {
			TriggerSource::Schedule => "schedule",
			TriggerSource::Manual => "manual",
		}
	}
}

impl std::str::FromStr for TriggerSource {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"schedule" => Ok(TriggerSource::Schedule),
			"manual" => Ok(TriggerSource::Manual),
			_ => Err(format!("unknown trigger source: {s}")),
		}
	}
}

/// Identity parameters for one run.
///
/// The token is unique per firing, so two firings (scheduled or manual,
/// even within the same wall-clock second) are never treated as the
/// same run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunParameters {
	pub token: i64,
	pub source: TriggerSource,
}

/// Outcome of one step within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
	Completed,
	Failed,
}

/// Per-step bookkeeping nested under a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepExecution {
	pub step_name: String,
	pub read_count: u64,
	pub write_count: u64,
	pub status: StepStatus,
	pub error: Option<String>,
}

impl StepExecution {
	pub fn new(step_name: &str) -> Self {
		Self {
			step_name: step_name.to_string(),
			read_count: 0,
			write_count: 0,
			status: StepStatus::Completed,
			error: None,
		}
	}

	pub fn fail(&mut self, error: String) {
		self.status = StepStatus::Failed;
		self.error = Some(error);
	}
}

/// One end-to-end execution of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRun {
	pub id: String,
	pub parameters: RunParameters,
	pub status: RunStatus,
	pub started_at: DateTime<Utc>,
	pub ended_at: Option<DateTime<Utc>>,
	pub step_executions: Vec<StepExecution>,
	pub failures: Vec<String>,
	pub context: ExecutionContext,
}

impl JobRun {
	pub fn new(parameters: RunParameters, started_at: DateTime<Utc>) -> Self {
		Self {
			id: uuid::Uuid::new_v4().to_string(),
			parameters,
			status: RunStatus::Starting,
			started_at,
			ended_at: None,
			step_executions: Vec::new(),
			failures: Vec::new(),
			context: ExecutionContext::new(),
		}
	}

	/// Wall-clock duration of the run, if it has ended.
	pub fn duration_ms(&self) -> Option<i64> {
		self.ended_at
			.map(|ended| (ended - self.started_at).num_milliseconds())
	}
}
