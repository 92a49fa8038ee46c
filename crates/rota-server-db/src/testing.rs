// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::SqlitePool;

pub async fn create_test_pool() -> SqlitePool {
	SqlitePool::connect(":memory:").await.unwrap()
}

pub async fn create_appointments_table(pool: &SqlitePool) {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS appointments (
			id TEXT PRIMARY KEY,
			scheduled_date TEXT NOT NULL,
			scheduled_time TEXT NOT NULL,
			status TEXT NOT NULL,
			doctor_id TEXT NOT NULL,
			hospital_id TEXT NOT NULL,
			referral_id TEXT,
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await
	.unwrap();
}
