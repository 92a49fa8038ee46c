// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Transform stage: `Scheduled` → `Missed`.

use rota_appointments_core::{Appointment, AppointmentStatus};

use crate::step::ItemProcessor;

/// Pure, stateless mapping applied to every eligible appointment.
///
/// Scheduled appointments come out marked `Missed`; anything else
/// passes through untouched.
pub struct MarkMissedProcessor;

impl ItemProcessor<Appointment, Appointment> for MarkMissedProcessor {
	fn process(&self, item: Appointment) -> Appointment {
		if item.status == AppointmentStatus::Scheduled {
			item.with_status(AppointmentStatus::Missed)
		} else {
			item
		}
	}
}
