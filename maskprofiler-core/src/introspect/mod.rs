//! Database introspection adapters for schema and table discovery.
//!
//! One adapter per supported engine, each implementing the object-safe
//! [`SchemaIntrospector`] trait. Adapters open a short-lived connection per
//! call (connect, query, close); the discovery workload is a handful of
//! catalog queries and does not warrant a pool.

use crate::error::MaskProfilerError;
use crate::Result;
use async_trait::async_trait;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[cfg(feature = "mssql")]
pub mod mssql;
#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "oracle")]
pub mod oracle;
#[cfg(feature = "postgresql")]
pub mod postgres;

/// A password held for the lifetime of a target, wiped on drop.
///
/// `Debug` and `Display` never reveal the value; callers that genuinely need
/// it (driver connect calls, connector payloads) use [`Secret::expose`].
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the underlying value. Must never be logged.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(****)")
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Oracle connection identifier: exactly one of SID or SERVICE_NAME.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleConnect {
    Sid(String),
    ServiceName(String),
}

impl OracleConnect {
    /// Builds the identifier from the two caller-supplied options, enforcing
    /// mutual exclusivity. Empty strings count as unset.
    ///
    /// # Errors
    /// Returns a configuration error when both or neither are set.
    pub fn from_options(sid: Option<String>, service_name: Option<String>) -> Result<Self> {
        let sid = sid.filter(|s| !s.trim().is_empty());
        let service_name = service_name.filter(|s| !s.trim().is_empty());

        match (sid, service_name) {
            (Some(_), Some(_)) => Err(MaskProfilerError::configuration(
                "Both SID and SERVICE_NAME were provided; they are mutually exclusive",
            )),
            (None, None) => Err(MaskProfilerError::configuration(
                "Neither SID nor SERVICE_NAME was provided; one of them must be set",
            )),
            (Some(sid), None) => Ok(Self::Sid(sid)),
            (None, Some(service)) => Ok(Self::ServiceName(service)),
        }
    }
}

impl fmt::Display for OracleConnect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sid(sid) => write!(f, "SID={sid}"),
            Self::ServiceName(service) => write!(f, "SERVICE_NAME={service}"),
        }
    }
}

/// Engine discriminant, selected once at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseEngine {
    Oracle,
    Mssql,
    MySql,
    Postgres,
}

impl fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Oracle => "ORACLE",
            Self::Mssql => "MSSQL",
            Self::MySql => "MYSQL",
            Self::Postgres => "POSTGRES",
        })
    }
}

/// Engine-specific addressing for a source database.
#[derive(Debug, Clone)]
pub enum EngineTarget {
    Oracle { connect: OracleConnect },
    Mssql { database: String },
    MySql { database: String },
    Postgres { database: String },
}

impl EngineTarget {
    pub fn engine(&self) -> DatabaseEngine {
        match self {
            Self::Oracle { .. } => DatabaseEngine::Oracle,
            Self::Mssql { .. } => DatabaseEngine::Mssql,
            Self::MySql { .. } => DatabaseEngine::MySql,
            Self::Postgres { .. } => DatabaseEngine::Postgres,
        }
    }
}

/// A reachable source database, as supplied by the (already validated)
/// configuration layer. The password is held in a [`Secret`] and never
/// appears in `Debug` or `Display` output.
#[derive(Debug, Clone)]
pub struct DatabaseTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Secret,
    pub engine: EngineTarget,
}

impl DatabaseTarget {
    /// Validates the parts of the target the core is responsible for.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(MaskProfilerError::configuration("host cannot be empty"));
        }
        if self.port == 0 {
            return Err(MaskProfilerError::configuration(
                "port must be greater than 0",
            ));
        }
        if self.username.is_empty() {
            return Err(MaskProfilerError::configuration("username cannot be empty"));
        }
        Ok(())
    }

    pub fn engine(&self) -> DatabaseEngine {
        self.engine.engine()
    }

    /// Database name for engines that are scoped to one, if any.
    pub fn database(&self) -> Option<&str> {
        match &self.engine {
            EngineTarget::Oracle { .. } => None,
            EngineTarget::Mssql { database }
            | EngineTarget::MySql { database }
            | EngineTarget::Postgres { database } => Some(database),
        }
    }
}

impl fmt::Display for DatabaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}@{}:{}",
            self.engine(),
            self.username,
            self.host,
            self.port
        )?;
        match &self.engine {
            EngineTarget::Oracle { connect } => write!(f, " ({connect})"),
            EngineTarget::Mssql { database }
            | EngineTarget::MySql { database }
            | EngineTarget::Postgres { database } => write!(f, "/{database}"),
        }
    }
}

/// Polymorphic schema/table discovery over heterogeneous engines.
///
/// Object-safe: selected once at configuration time and handed to the
/// provisioning pipeline as `&dyn SchemaIntrospector`.
#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
    /// The engine this introspector talks to.
    fn engine(&self) -> DatabaseEngine;

    /// Non-system schemas, alphabetically sorted.
    ///
    /// # Errors
    /// `Connection` if the database cannot be reached, `Query` on SQL failure.
    async fn list_schemas(&self) -> Result<Vec<String>>;

    /// Base tables of one schema, alphabetically sorted.
    ///
    /// # Errors
    /// `Connection` if the database cannot be reached, `Query` on SQL failure.
    async fn list_tables(&self, schema: &str) -> Result<Vec<String>>;
}

/// Creates the introspector matching the target's engine.
///
/// # Errors
/// Returns a configuration error if the target is invalid or the engine's
/// driver was not compiled in.
pub fn create_introspector(target: &DatabaseTarget) -> Result<Box<dyn SchemaIntrospector>> {
    target.validate()?;

    match target.engine() {
        DatabaseEngine::Oracle => {
            #[cfg(feature = "oracle")]
            {
                Ok(Box::new(oracle::OracleIntrospector::new(target.clone())))
            }
            #[cfg(not(feature = "oracle"))]
            {
                Err(MaskProfilerError::configuration(
                    "Oracle support not compiled in. Use --features oracle",
                ))
            }
        }
        DatabaseEngine::Mssql => {
            #[cfg(feature = "mssql")]
            {
                Ok(Box::new(mssql::MssqlIntrospector::new(target.clone())))
            }
            #[cfg(not(feature = "mssql"))]
            {
                Err(MaskProfilerError::configuration(
                    "MSSQL support not compiled in. Use --features mssql",
                ))
            }
        }
        DatabaseEngine::MySql => {
            #[cfg(feature = "mysql")]
            {
                Ok(Box::new(mysql::MySqlIntrospector::new(target.clone())))
            }
            #[cfg(not(feature = "mysql"))]
            {
                Err(MaskProfilerError::configuration(
                    "MySQL support not compiled in. Use --features mysql",
                ))
            }
        }
        DatabaseEngine::Postgres => {
            #[cfg(feature = "postgresql")]
            {
                Ok(Box::new(postgres::PostgresIntrospector::new(
                    target.clone(),
                )))
            }
            #[cfg(not(feature = "postgresql"))]
            {
                Err(MaskProfilerError::configuration(
                    "PostgreSQL support not compiled in. Use --features postgresql",
                ))
            }
        }
    }
}
