// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Run-scoped execution context.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Context key the aggregation step writes the store's full count under.
pub const TOTAL_RECORDS_KEY: &str = "totalRecords";

/// Context key the aggregation step writes the missed count under.
pub const MISSED_RECORDS_KEY: &str = "missedRecords";

/// String-keyed value bag owned by exactly one run.
///
/// Steps thread data to later steps and to the run listener through
/// this context; it is passed explicitly rather than living in ambient
/// state, and nothing survives beyond the run that owns it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionContext {
	values: HashMap<String, serde_json::Value>,
}

impl ExecutionContext {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn put(&mut self, key: &str, value: serde_json::Value) {
		self.values.insert(key.to_string(), value);
	}

	pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
		self.values.get(key)
	}

	pub fn put_i64(&mut self, key: &str, value: i64) {
		self.put(key, serde_json::Value::from(value));
	}

	pub fn get_i64(&self, key: &str) -> Option<i64> {
		self.get(key).and_then(|v| v.as_i64())
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}
}
