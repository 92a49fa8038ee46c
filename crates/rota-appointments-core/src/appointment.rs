// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Appointment entity and id newtypes.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppointmentId(pub Uuid);

impl AppointmentId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for AppointmentId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for AppointmentId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for AppointmentId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// Identifier for the doctor an appointment is booked with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DoctorId(pub Uuid);

impl DoctorId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for DoctorId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for DoctorId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for DoctorId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// Identifier for the hospital an appointment takes place at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HospitalId(pub Uuid);

impl HospitalId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for HospitalId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for HospitalId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for HospitalId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// Identifier for the referral that produced an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferralId(pub Uuid);

impl ReferralId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for ReferralId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for ReferralId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for ReferralId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// Lifecycle status of an appointment.
///
/// The reconciliation pipeline only ever performs the `Scheduled` →
/// `Missed` transition; every other transition belongs to other parts of
/// the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
	Open,
	Scheduled,
	Missed,
	Finished,
}

impl AppointmentStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			AppointmentStatus::Open => "open",
			AppointmentStatus::Scheduled => "scheduled",
			AppointmentStatus::Missed => "missed",
			AppointmentStatus::Finished => "finished",
		}
	}

	/// All statuses, in the order they are reported by the aggregation
	/// step.
	pub fn all() -> [AppointmentStatus; 4] {
		[
			AppointmentStatus::Open,
			AppointmentStatus::Scheduled,
			AppointmentStatus::Missed,
			AppointmentStatus::Finished,
		]
	}
}

impl fmt::Display for AppointmentStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for AppointmentStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"open" => Ok(AppointmentStatus::Open),
			"scheduled" => Ok(AppointmentStatus::Scheduled),
			"missed" => Ok(AppointmentStatus::Missed),
			"finished" => Ok(AppointmentStatus::Finished),
			_ => Err(format!("unknown appointment status: {s}")),
		}
	}
}

/// A booked appointment slot.
///
/// The doctor, hospital and referral references are carried through the
/// pipeline unchanged; only `status` is ever rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
	pub id: AppointmentId,
	pub scheduled_date: NaiveDate,
	pub scheduled_time: NaiveTime,
	pub status: AppointmentStatus,
	pub doctor_id: DoctorId,
	pub hospital_id: HospitalId,
	pub referral_id: Option<ReferralId>,
}

impl Appointment {
	/// Return a copy of this appointment with its status replaced.
	pub fn with_status(&self, status: AppointmentStatus) -> Appointment {
		Appointment {
			status,
			..self.clone()
		}
	}
}
