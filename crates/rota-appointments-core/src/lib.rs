// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core appointment types for the Rota reconciliation system.
//!
//! This crate holds the domain entity shared by the persistence layer and
//! the reconciliation pipeline: the appointment itself, its status
//! enumeration, id newtypes for the owning entities, and the overdue
//! predicate that decides whether a scheduled appointment has elapsed.

pub mod appointment;
pub mod overdue;

pub use appointment::{Appointment, AppointmentId, AppointmentStatus, DoctorId, HospitalId, ReferralId};
pub use overdue::is_overdue;
