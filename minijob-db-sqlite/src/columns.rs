use chrono::NaiveDate;
use minijob_core::{Money, RepositoryError};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

/// Read an INTEGER cents column into [`Money`].
pub fn get_money(row: &SqliteRow, column: &str) -> Result<Money, RepositoryError> {
    let cents: i64 = row.try_get(column).map_err(|e| {
        RepositoryError::Database(format!("Failed to read cents column '{column}': {e}"))
    })?;
    Ok(Money::from_cents(cents))
}

/// Read a TEXT date column (ISO-8601 `YYYY-MM-DD`).
pub fn get_date(row: &SqliteRow, column: &str) -> Result<NaiveDate, RepositoryError> {
    row.try_get(column).map_err(|e| {
        RepositoryError::Database(format!("Failed to read date column '{column}': {e}"))
    })
}

/// Read a nullable TEXT date column.
pub fn get_optional_date(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<NaiveDate>, RepositoryError> {
    row.try_get(column).map_err(|e| {
        RepositoryError::Database(format!("Failed to read date column '{column}': {e}"))
    })
}
