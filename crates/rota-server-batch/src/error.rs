// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the reconciliation pipeline.

use thiserror::Error;

/// Result type for batch operations.
pub type Result<T> = std::result::Result<T, BatchError>;

/// Errors that can occur while executing a run.
#[derive(Debug, Error)]
pub enum BatchError {
	#[error("database error: {0}")]
	Db(#[from] rota_server_db::DbError),

	#[error("invalid cron expression: {0}")]
	InvalidCronExpression(String),

	#[error("invalid timezone: {0}")]
	InvalidTimezone(String),

	#[error("internal error: {0}")]
	Internal(String),
}
