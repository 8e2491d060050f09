//! MySQL introspection over a short-lived sqlx connection per call.
//!
//! MySQL targets are scoped to a single database: `list_schemas` reports just
//! the configured database name, and `list_tables` is answered from
//! `information_schema.tables` for that database.

use super::{DatabaseEngine, DatabaseTarget, SchemaIntrospector};
use crate::error::MaskProfilerError;
use crate::Result;
use async_trait::async_trait;
use sqlx::mysql::MySqlConnectOptions;
use sqlx::{ConnectOptions, Connection, MySqlConnection};

const TABLES_SQL: &str = r"
    SELECT table_name
    FROM information_schema.tables
    WHERE table_schema = ?
      AND table_type = 'BASE TABLE'
    ORDER BY table_name
";

/// MySQL table discovery, single-database scope.
pub struct MySqlIntrospector {
    target: DatabaseTarget,
}

impl MySqlIntrospector {
    pub fn new(target: DatabaseTarget) -> Self {
        Self { target }
    }

    fn database(&self) -> &str {
        self.target.database().unwrap_or_default()
    }

    async fn connect(&self) -> Result<MySqlConnection> {
        let options = MySqlConnectOptions::new()
            .host(&self.target.host)
            .port(self.target.port)
            .database(self.database())
            .username(&self.target.username)
            .password(self.target.password.expose());

        options
            .connect()
            .await
            .map_err(|e| MaskProfilerError::connection_failed(self.target.to_string(), e))
    }
}

#[async_trait]
impl SchemaIntrospector for MySqlIntrospector {
    fn engine(&self) -> DatabaseEngine {
        DatabaseEngine::MySql
    }

    async fn list_schemas(&self) -> Result<Vec<String>> {
        // One connector per database; the database is the schema.
        Ok(vec![self.database().to_string()])
    }

    async fn list_tables(&self, schema: &str) -> Result<Vec<String>> {
        tracing::info!("Discovering tables for database '{schema}'");
        let mut conn = self.connect().await?;

        let tables: Vec<String> = sqlx::query_scalar(TABLES_SQL)
            .bind(schema)
            .fetch_all(&mut conn)
            .await
            .map_err(|e| {
                MaskProfilerError::query_failed(
                    format!("Failed to enumerate tables for database '{schema}'"),
                    e,
                )
            })?;

        conn.close().await.ok();

        tracing::info!("Found {} table(s) in '{schema}'", tables.len());
        Ok(tables)
    }
}
