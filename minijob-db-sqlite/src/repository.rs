use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use tracing::debug;

use minijob_core::db::{PayrollRepository, RepositoryError};
use minijob_core::models::{BillingPeriodConfig, CapPeriod, Employee, Entry};
use minijob_core::timeline::TimelineChange;

use crate::columns::{get_date, get_money, get_optional_date};

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Connect to `database_url` — a file path, a `sqlite:` URL, or
    /// `":memory:"`.
    pub async fn new(database_url: &str) -> Result<Self> {
        // An in-memory database exists per connection; a larger pool would
        // hand out connections that see different databases.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .with_context(|| format!("Failed to connect to database: {database_url}"))?;
        Ok(Self { pool })
    }

    pub fn with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_err(e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

fn row_to_cap_period(row: &SqliteRow) -> Result<CapPeriod, RepositoryError> {
    Ok(CapPeriod {
        id: row.try_get("id").map_err(db_err)?,
        limit: get_money(row, "limit_cents")?,
        valid_from: get_date(row, "valid_from")?,
        valid_until: get_optional_date(row, "valid_until")?,
        created_by: row.try_get("created_by").map_err(db_err)?,
        is_active: row.try_get("is_active").map_err(db_err)?,
    })
}

fn row_to_entry(row: &SqliteRow) -> Result<Entry, RepositoryError> {
    Ok(Entry {
        id: row.try_get("id").map_err(db_err)?,
        employee_id: row.try_get("employee_id").map_err(db_err)?,
        worked_on: get_date(row, "worked_on")?,
        earnings: get_money(row, "earnings_cents")?,
    })
}

fn row_to_employee(row: &SqliteRow) -> Result<Employee, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(db_err)?;
    let start_day: u32 = row.try_get("billing_start_day").map_err(db_err)?;
    let end_day: u32 = row.try_get("billing_end_day").map_err(db_err)?;
    let billing = BillingPeriodConfig::new(start_day, end_day).map_err(|e| {
        RepositoryError::Database(format!("Employee {id} has an invalid billing window: {e}"))
    })?;
    Ok(Employee {
        id,
        name: row.try_get("name").map_err(db_err)?,
        billing,
    })
}

#[async_trait]
impl PayrollRepository for SqliteRepository {
    async fn list_cap_periods(&self) -> Result<Vec<CapPeriod>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, limit_cents, valid_from, valid_until, created_by, is_active
             FROM cap_periods ORDER BY valid_from",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(row_to_cap_period).collect()
    }

    async fn get_cap_period(&self, id: i64) -> Result<CapPeriod, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, limit_cents, valid_from, valid_until, created_by, is_active
             FROM cap_periods WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;
        row_to_cap_period(&row)
    }

    async fn apply_timeline_change(
        &self,
        change: &TimelineChange,
    ) -> Result<Option<CapPeriod>, RepositoryError> {
        if change.is_empty() {
            return Ok(None);
        }
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // An early return drops the transaction, rolling every prior
        // statement of the batch back.
        for (id, valid_until) in &change.set_valid_until {
            let result = sqlx::query("UPDATE cap_periods SET valid_until = ? WHERE id = ?")
                .bind(*valid_until)
                .bind(*id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            if result.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }
        }
        for (id, active) in &change.set_active {
            let result = sqlx::query("UPDATE cap_periods SET is_active = ? WHERE id = ?")
                .bind(*active)
                .bind(*id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            if result.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }
        }
        if let Some(updated) = &change.update {
            let result = sqlx::query(
                "UPDATE cap_periods
                 SET limit_cents = ?, valid_from = ?, valid_until = ?, created_by = ?
                 WHERE id = ?",
            )
            .bind(updated.limit.cents())
            .bind(updated.valid_from)
            .bind(updated.valid_until)
            .bind(updated.created_by)
            .bind(updated.id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
            if result.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }
        }
        if let Some(id) = change.delete {
            let result = sqlx::query("DELETE FROM cap_periods WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            if result.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }
        }
        let inserted = match &change.insert {
            Some(new) => {
                let row = sqlx::query(
                    "INSERT INTO cap_periods (limit_cents, valid_from, valid_until, created_by)
                     VALUES (?, ?, ?, ?)
                     RETURNING id, limit_cents, valid_from, valid_until, created_by, is_active",
                )
                .bind(new.limit.cents())
                .bind(new.valid_from)
                .bind(new.valid_until)
                .bind(new.created_by)
                .fetch_one(&mut *tx)
                .await
                .map_err(db_err)?;
                Some(row_to_cap_period(&row)?)
            }
            None => None,
        };

        tx.commit().await.map_err(db_err)?;
        debug!(
            truncations = change.set_valid_until.len(),
            inserted = inserted.is_some(),
            deleted = change.delete.is_some(),
            "timeline change applied"
        );
        Ok(inserted)
    }

    async fn list_entries(
        &self,
        employee_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Entry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, employee_id, worked_on, earnings_cents
             FROM entries
             WHERE employee_id = ? AND worked_on BETWEEN ? AND ?
             ORDER BY worked_on, id",
        )
        .bind(employee_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(row_to_entry).collect()
    }

    async fn first_entry_date(
        &self,
        employee_id: i64,
    ) -> Result<Option<NaiveDate>, RepositoryError> {
        // ISO dates stored as TEXT sort chronologically.
        let row = sqlx::query("SELECT MIN(worked_on) AS first FROM entries WHERE employee_id = ?")
            .bind(employee_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        get_optional_date(&row, "first")
    }

    async fn get_employee(&self, id: i64) -> Result<Employee, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, billing_start_day, billing_end_day FROM employees WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;
        row_to_employee(&row)
    }
}
