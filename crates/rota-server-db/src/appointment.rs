// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use sqlx::SqlitePool;

use rota_appointments_core::{Appointment, AppointmentId, AppointmentStatus};

use crate::error::{DbError, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

/// Store interface consumed by the reconciliation pipeline.
///
/// `save` and `save_chunk` are upserts keyed on the appointment id.
/// `save_chunk` persists the whole group inside one transaction; the
/// chunk is the unit of transactional recovery.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
	async fn find_by_status(&self, status: AppointmentStatus) -> Result<Vec<Appointment>>;
	async fn find_by_id(&self, id: AppointmentId) -> Result<Option<Appointment>>;
	async fn count(&self) -> Result<i64>;
	async fn count_by_status(&self, status: AppointmentStatus) -> Result<i64>;
	async fn save(&self, appointment: &Appointment) -> Result<()>;
	async fn save_chunk(&self, appointments: &[Appointment]) -> Result<()>;
}

type AppointmentRow = (String, String, String, String, String, String, Option<String>);

fn decode_row(row: AppointmentRow) -> Result<Appointment> {
	let (id, date, time, status, doctor_id, hospital_id, referral_id) = row;
	Ok(Appointment {
		id: id
			.parse()
			.map_err(|e| DbError::InvalidRow(format!("appointment id: {e}")))?,
		scheduled_date: chrono::NaiveDate::parse_from_str(&date, DATE_FORMAT)
			.map_err(|e| DbError::InvalidRow(format!("scheduled date: {e}")))?,
		scheduled_time: chrono::NaiveTime::parse_from_str(&time, TIME_FORMAT)
			.map_err(|e| DbError::InvalidRow(format!("scheduled time: {e}")))?,
		status: status
			.parse()
			.map_err(|e| DbError::InvalidRow(format!("status: {e}")))?,
		doctor_id: doctor_id
			.parse()
			.map_err(|e| DbError::InvalidRow(format!("doctor id: {e}")))?,
		hospital_id: hospital_id
			.parse()
			.map_err(|e| DbError::InvalidRow(format!("hospital id: {e}")))?,
		referral_id: referral_id
			.map(|id| id.parse())
			.transpose()
			.map_err(|e| DbError::InvalidRow(format!("referral id: {e}")))?,
	})
}

const UPSERT_SQL: &str = r#"
            INSERT INTO appointments (id, scheduled_date, scheduled_time, status, doctor_id, hospital_id, referral_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                scheduled_date = excluded.scheduled_date,
                scheduled_time = excluded.scheduled_time,
                status = excluded.status,
                doctor_id = excluded.doctor_id,
                hospital_id = excluded.hospital_id,
                referral_id = excluded.referral_id,
                updated_at = excluded.updated_at
            "#;

/// SQLite-backed appointment store.
#[derive(Clone)]
pub struct SqliteAppointmentStore {
	pool: SqlitePool,
}

impl SqliteAppointmentStore {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

#[async_trait]
impl AppointmentStore for SqliteAppointmentStore {
	#[tracing::instrument(skip(self))]
	async fn find_by_status(&self, status: AppointmentStatus) -> Result<Vec<Appointment>> {
		let rows = sqlx::query_as::<_, AppointmentRow>(
			"SELECT id, scheduled_date, scheduled_time, status, doctor_id, hospital_id, referral_id FROM appointments WHERE status = ? ORDER BY scheduled_date, scheduled_time",
		)
		.bind(status.as_str())
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(decode_row).collect()
	}

	#[tracing::instrument(skip(self))]
	async fn find_by_id(&self, id: AppointmentId) -> Result<Option<Appointment>> {
		let row = sqlx::query_as::<_, AppointmentRow>(
			"SELECT id, scheduled_date, scheduled_time, status, doctor_id, hospital_id, referral_id FROM appointments WHERE id = ?",
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(decode_row).transpose()
	}

	#[tracing::instrument(skip(self))]
	async fn count(&self) -> Result<i64> {
		let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM appointments")
			.fetch_one(&self.pool)
			.await?;
		Ok(count)
	}

	#[tracing::instrument(skip(self))]
	async fn count_by_status(&self, status: AppointmentStatus) -> Result<i64> {
		let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM appointments WHERE status = ?")
			.bind(status.as_str())
			.fetch_one(&self.pool)
			.await?;
		Ok(count)
	}

	#[tracing::instrument(skip(self, appointment), fields(appointment_id = %appointment.id))]
	async fn save(&self, appointment: &Appointment) -> Result<()> {
		let now = Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true);
		sqlx::query(UPSERT_SQL)
			.bind(appointment.id.to_string())
			.bind(appointment.scheduled_date.format(DATE_FORMAT).to_string())
			.bind(appointment.scheduled_time.format(TIME_FORMAT).to_string())
			.bind(appointment.status.as_str())
			.bind(appointment.doctor_id.to_string())
			.bind(appointment.hospital_id.to_string())
			.bind(appointment.referral_id.map(|id| id.to_string()))
			.bind(&now)
			.bind(&now)
			.execute(&self.pool)
			.await?;

		Ok(())
	}

	#[tracing::instrument(skip(self, appointments), fields(chunk_len = appointments.len()))]
	async fn save_chunk(&self, appointments: &[Appointment]) -> Result<()> {
		let now = Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true);
		let mut tx = self.pool.begin().await?;

		for appointment in appointments {
			sqlx::query(UPSERT_SQL)
				.bind(appointment.id.to_string())
				.bind(appointment.scheduled_date.format(DATE_FORMAT).to_string())
				.bind(appointment.scheduled_time.format(TIME_FORMAT).to_string())
				.bind(appointment.status.as_str())
				.bind(appointment.doctor_id.to_string())
				.bind(appointment.hospital_id.to_string())
				.bind(appointment.referral_id.map(|id| id.to_string()))
				.bind(&now)
				.bind(&now)
				.execute(&mut *tx)
				.await?;
		}

		tx.commit().await?;
		Ok(())
	}
}
