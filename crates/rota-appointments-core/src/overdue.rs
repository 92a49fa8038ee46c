// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Overdue predicate for scheduled appointments.

use chrono::NaiveDateTime;

use crate::appointment::{Appointment, AppointmentStatus};

/// Decide whether a scheduled appointment's slot has elapsed.
///
/// An appointment is overdue when its date is before today, or its date
/// is today and its time is strictly before the current time. A slot at
/// exactly `now` is not yet overdue.
///
/// Only `Scheduled` appointments can be overdue; every other status
/// returns `false`.
///
/// `now` must be captured once per scan and reused for every
/// appointment, so the predicate cannot change its answer mid-scan.
pub fn is_overdue(appointment: &Appointment, now: NaiveDateTime) -> bool {
	if appointment.status != AppointmentStatus::Scheduled {
		return false;
	}

	let today = now.date();
	appointment.scheduled_date < today
		|| (appointment.scheduled_date == today && appointment.scheduled_time < now.time())
}
