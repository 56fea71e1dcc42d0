//! Startup configuration.
//!
//! Everything here is built once, usually from the environment, and passed
//! explicitly to the components that need it.

use std::env;

use crate::{IdGenerator, StorageDatetime, StorageError};

/// Drivers [`ConnectionConfig::from_env`] accepts.
const SUPPORTED_DRIVERS: &[&str] = &["postgres", "postgresql"];

/// How to reach the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionConfig {
    /// A complete connection URL.
    Url(String),
    Credentials {
        driver: String,
        host: String,
        port: u16,
        user: String,
        pass: String,
        database: String,
    },
}

impl ConnectionConfig {
    /// Read `<prefix>_driver`, `_host`, `_port`, `_user`, `_pass` and `_name`.
    /// An empty prefix means `db`.
    pub fn from_env(prefix: &str) -> Result<Self, StorageError> {
        Self::from_lookup(prefix, |key| env::var(key).ok())
    }

    fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self, StorageError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = if prefix.is_empty() { "db" } else { prefix };
        let var = |suffix: &str| {
            let key = format!("{}_{}", prefix, suffix);
            lookup(&key).ok_or_else(|| StorageError::Config(format!("{} is not set", key)))
        };

        let driver = var("driver")?;
        if !SUPPORTED_DRIVERS.contains(&driver.as_str()) {
            return Err(StorageError::Config(format!(
                "unsupported driver {}",
                driver
            )));
        }

        let port = var("port")?;
        let port = port
            .parse()
            .map_err(|_| StorageError::Config(format!("invalid {}_port {}", prefix, port)))?;

        Ok(ConnectionConfig::Credentials {
            driver,
            host: var("host")?,
            port,
            user: var("user")?,
            pass: var("pass")?,
            database: var("name")?,
        })
    }

    pub fn to_url(&self) -> String {
        match self {
            ConnectionConfig::Url(url) => url.clone(),
            ConnectionConfig::Credentials {
                host,
                port,
                user,
                pass,
                database,
                ..
            } => format!(
                "postgres://{}:{}@{}:{}/{}",
                user, pass, host, port, database
            ),
        }
    }
}

impl From<&str> for ConnectionConfig {
    fn from(url: &str) -> Self {
        ConnectionConfig::Url(url.to_string())
    }
}

impl From<String> for ConnectionConfig {
    fn from(url: String) -> Self {
        ConnectionConfig::Url(url)
    }
}

impl From<&String> for ConnectionConfig {
    fn from(url: &String) -> Self {
        ConnectionConfig::Url(url.clone())
    }
}

/// Deployment mode. Outside production generated UUIDs carry a `dev-` prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AppMode {
    Production,
    #[default]
    Development,
}

impl AppMode {
    /// Read `app_mode`; anything but `production` is development.
    pub fn from_env() -> Self {
        Self::parse(env::var("app_mode").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("production") => AppMode::Production,
            _ => AppMode::Development,
        }
    }

    pub fn uuid_prefix(&self) -> &'static str {
        match self {
            AppMode::Production => "",
            AppMode::Development => "dev-",
        }
    }
}

/// Settings for the audit recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditConfig {
    /// `host:port` of the running service, stored as `service_ip`.
    pub service_identity: String,
    pub start_time: StorageDatetime,
    pub machine_id: u16,
    pub table: String,
}

impl AuditConfig {
    pub const DEFAULT_TABLE: &'static str = "audit_trail";
    pub const DEFAULT_MACHINE_ID: u16 = 1;

    pub fn new(service_identity: impl Into<String>) -> Self {
        Self {
            service_identity: service_identity.into(),
            start_time: IdGenerator::default_start_time(),
            machine_id: Self::DEFAULT_MACHINE_ID,
            table: Self::DEFAULT_TABLE.to_string(),
        }
    }

    /// Identity from the host name and the `port` environment variable.
    pub fn from_env() -> Result<Self, StorageError> {
        let host = hostname::get()
            .map_err(|e| StorageError::Config(format!("cannot read host name: {}", e)))?;
        let port = env::var("port").unwrap_or_default();
        Ok(Self::new(format!("{}:{}", host.to_string_lossy(), port)))
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_machine_id(mut self, machine_id: u16) -> Self {
        self.machine_id = machine_id;
        self
    }

    pub fn with_start_time(mut self, start_time: StorageDatetime) -> Self {
        self.start_time = start_time;
        self
    }
}
