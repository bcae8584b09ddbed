use std::collections::HashMap;

use async_trait::async_trait;

use super::repository::{PayrollRepository, RepositoryError};

/// Backend-agnostic connection configuration.
///
/// `backend` must match the [`RepositoryFactory::backend_name`] of a
/// registered factory; `connection_string` is forwarded to that factory
/// unchanged and its meaning is entirely backend-specific (a file path,
/// `":memory:"`, a server URL).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub backend: String,
    pub connection_string: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: ":memory:".to_string(),
        }
    }
}

/// One implementation per storage backend. A backend crate exports a unit
/// struct implementing this trait and registers it with a
/// [`RepositoryRegistry`] at startup.
#[async_trait]
pub trait RepositoryFactory: Send + Sync {
    /// Unique, lowercase identifier for this backend.
    fn backend_name(&self) -> &'static str;

    /// Open (or create) a connection and return a ready-to-use repository.
    /// Implementations may run migrations or warm pools in here.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn PayrollRepository>, RepositoryError>;
}

/// Registry of [`RepositoryFactory`] instances, keyed by backend name.
#[derive(Default)]
pub struct RepositoryRegistry {
    factories: HashMap<&'static str, Box<dyn RepositoryFactory>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend factory. A factory with the same name silently
    /// replaces the previous one.
    pub fn register(&mut self, factory: Box<dyn RepositoryFactory>) {
        self.factories.insert(factory.backend_name(), factory);
    }

    /// Names of every registered backend, sorted alphabetically.
    pub fn available_backends(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Dispatch to the factory matching `config.backend`.
    ///
    /// # Errors
    /// * [`RepositoryError::Configuration`] — no factory is registered
    ///   under the requested backend name.
    /// * Anything the chosen factory itself returns.
    pub async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn PayrollRepository>, RepositoryError> {
        let factory = self.factories.get(config.backend.as_str()).ok_or_else(|| {
            RepositoryError::Configuration(format!(
                "Unknown backend '{}'; available: {:?}",
                config.backend,
                self.available_backends()
            ))
        })?;
        factory.create(config).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use crate::models::{CapPeriod, Employee, Entry};
    use crate::timeline::TimelineChange;

    use super::*;

    /// Registry tests only exercise routing; no repository method is ever
    /// reached.
    struct StubRepository;

    #[async_trait]
    impl PayrollRepository for StubRepository {
        async fn list_cap_periods(&self) -> Result<Vec<CapPeriod>, RepositoryError> {
            unimplemented!()
        }
        async fn get_cap_period(&self, _id: i64) -> Result<CapPeriod, RepositoryError> {
            unimplemented!()
        }
        async fn apply_timeline_change(
            &self,
            _change: &TimelineChange,
        ) -> Result<Option<CapPeriod>, RepositoryError> {
            unimplemented!()
        }
        async fn list_entries(
            &self,
            _employee_id: i64,
            _from: NaiveDate,
            _to: NaiveDate,
        ) -> Result<Vec<Entry>, RepositoryError> {
            unimplemented!()
        }
        async fn first_entry_date(
            &self,
            _employee_id: i64,
        ) -> Result<Option<NaiveDate>, RepositoryError> {
            unimplemented!()
        }
        async fn get_employee(&self, _id: i64) -> Result<Employee, RepositoryError> {
            unimplemented!()
        }
    }

    struct StubFactory {
        name: &'static str,
        called: Arc<AtomicBool>,
    }

    #[async_trait]
    impl RepositoryFactory for StubFactory {
        fn backend_name(&self) -> &'static str {
            self.name
        }
        async fn create(
            &self,
            _config: &DbConfig,
        ) -> Result<Box<dyn PayrollRepository>, RepositoryError> {
            self.called.store(true, Ordering::SeqCst);
            Ok(Box::new(StubRepository))
        }
    }

    fn stub_factory(name: &'static str) -> (Box<dyn RepositoryFactory>, Arc<AtomicBool>) {
        let called = Arc::new(AtomicBool::new(false));
        (Box::new(StubFactory { name, called: called.clone() }), called)
    }

    #[test]
    fn default_config_is_in_memory_sqlite() {
        let config = DbConfig::default();

        assert_eq!(config.backend, "sqlite");
        assert_eq!(config.connection_string, ":memory:");
    }

    #[test]
    fn a_new_registry_has_no_backends() {
        assert!(RepositoryRegistry::new().available_backends().is_empty());
    }

    #[test]
    fn available_backends_are_sorted() {
        let mut registry = RepositoryRegistry::new();
        let (sqlite, _) = stub_factory("sqlite");
        let (postgres, _) = stub_factory("postgres");
        registry.register(sqlite);
        registry.register(postgres);

        assert_eq!(registry.available_backends(), vec!["postgres", "sqlite"]);
    }

    #[test]
    fn re_registering_a_name_replaces_the_factory() {
        let mut registry = RepositoryRegistry::new();
        let (old, _) = stub_factory("sqlite");
        let (new, _) = stub_factory("sqlite");
        registry.register(old);
        registry.register(new);

        assert_eq!(registry.available_backends(), vec!["sqlite"]);
    }

    #[tokio::test]
    async fn create_routes_to_the_matching_factory() {
        let mut registry = RepositoryRegistry::new();
        let (sqlite, sqlite_called) = stub_factory("sqlite");
        let (postgres, postgres_called) = stub_factory("postgres");
        registry.register(sqlite);
        registry.register(postgres);

        let result = registry.create(&DbConfig::default()).await;

        assert!(result.is_ok(), "expected Ok, got {:#?}", result.err());
        assert!(sqlite_called.load(Ordering::SeqCst));
        assert!(!postgres_called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn an_unknown_backend_is_a_configuration_error() {
        let mut registry = RepositoryRegistry::new();
        let (sqlite, _) = stub_factory("sqlite");
        registry.register(sqlite);

        let config = DbConfig {
            backend: "postgres".to_string(),
            connection_string: "x".to_string(),
        };

        match registry.create(&config).await {
            Err(RepositoryError::Configuration(message)) => {
                assert!(message.contains("postgres"), "names the requested backend");
                assert!(message.contains("sqlite"), "lists the available ones");
            }
            other => panic!("expected Configuration error, got {other:#?}"),
        }
    }

    #[tokio::test]
    async fn factory_errors_propagate_through_the_registry() {
        struct FailingFactory;

        #[async_trait]
        impl RepositoryFactory for FailingFactory {
            fn backend_name(&self) -> &'static str {
                "failing"
            }
            async fn create(
                &self,
                _config: &DbConfig,
            ) -> Result<Box<dyn PayrollRepository>, RepositoryError> {
                Err(RepositoryError::Connection("intentional failure".to_string()))
            }
        }

        let mut registry = RepositoryRegistry::new();
        registry.register(Box::new(FailingFactory));

        let config = DbConfig {
            backend: "failing".to_string(),
            connection_string: "x".to_string(),
        };

        let result = registry.create(&config).await;

        assert!(matches!(
            result,
            Err(RepositoryError::Connection(message)) if message == "intentional failure"
        ));
    }
}
