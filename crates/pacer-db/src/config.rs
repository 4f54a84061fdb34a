use std::env;

/// Environment variable honored by [`DbConfig::from_env`].
pub const URL_ENV: &str = "PACER_DATABASE_URL";

/// Connection settings for the pacer database.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full PostgreSQL connection URL.
    pub database_url: String,
}

impl DbConfig {
    /// Connection URL used when nothing else is configured.
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/pacer";

    /// Build a config from an explicit URL.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// Build a config from `PACER_DATABASE_URL`, falling back to
    /// [`Self::DEFAULT_URL`] when the variable is unset.
    pub fn from_env() -> Self {
        match env::var(URL_ENV) {
            Ok(url) => Self::new(url),
            Err(_) => Self::new(Self::DEFAULT_URL),
        }
    }

    /// The database name portion of the URL, query string stripped.
    ///
    /// `postgresql://host:5432/pacer?sslmode=require` yields `pacer`. Returns
    /// `None` when the URL has no path component.
    pub fn database_name(&self) -> Option<&str> {
        let (_, tail) = self.database_url.rsplit_once('/')?;
        let name = match tail.find(['?', '#']) {
            Some(idx) => &tail[..idx],
            None => tail,
        };
        (!name.is_empty()).then_some(name)
    }

    /// URL for the `postgres` maintenance database on the same server.
    ///
    /// `CREATE DATABASE` cannot run against the database being created, so
    /// bootstrap connects here instead.
    pub fn maintenance_url(&self) -> String {
        match self.database_url.rfind('/') {
            Some(idx) => format!("{}/postgres", &self.database_url[..idx]),
            None => self.database_url.clone(),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
