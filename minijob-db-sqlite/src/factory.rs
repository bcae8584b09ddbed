use async_trait::async_trait;

use minijob_core::db::{DbConfig, PayrollRepository, RepositoryError, RepositoryFactory};

use crate::repository::SqliteRepository;

/// [`RepositoryFactory`] for SQLite.
///
/// Register it with a [`minijob_core::db::RepositoryRegistry`] to make the
/// `"sqlite"` backend available:
///
/// ```rust,no_run
/// use minijob_core::db::RepositoryRegistry;
/// use minijob_db_sqlite::SqliteRepositoryFactory;
///
/// let mut registry = RepositoryRegistry::new();
/// registry.register(Box::new(SqliteRepositoryFactory));
/// ```
pub struct SqliteRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Open the database named by `config.connection_string` — a file path
    /// (append `?mode=rwc` to create it), a `sqlite:` URL, or `":memory:"`
    /// for an ephemeral database — and bring its schema up to date.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn PayrollRepository>, RepositoryError> {
        let repo = SqliteRepository::new(&config.connection_string)
            .await
            .map_err(|e| RepositoryError::Connection(e.to_string()))?;
        repo.run_migrations()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(Box::new(repo))
    }
}

#[cfg(test)]
mod tests {
    use minijob_core::db::{DbConfig, PayrollRepository, RepositoryFactory};

    use super::SqliteRepositoryFactory;

    #[test]
    fn backend_name_is_sqlite() {
        assert_eq!(SqliteRepositoryFactory.backend_name(), "sqlite");
    }

    /// Full round-trip: factory → migrated repository on an in-memory
    /// database.
    #[tokio::test]
    async fn creates_a_migrated_in_memory_repository() {
        let config = DbConfig::default();

        let repo = SqliteRepositoryFactory.create(&config).await;

        let repo = repo.expect("factory should produce a repository");
        let periods = repo.list_cap_periods().await.expect("schema is migrated");
        assert!(periods.is_empty());
    }
}
