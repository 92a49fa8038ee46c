// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for Rota appointments.
//!
//! Exposes the [`AppointmentStore`] trait consumed by the reconciliation
//! pipeline, together with its SQLite implementation and test helpers.

pub mod appointment;
pub mod error;
pub mod pool;
pub mod testing;

pub use appointment::{AppointmentStore, SqliteAppointmentStore};
pub use error::{DbError, Result};
pub use pool::create_pool;
