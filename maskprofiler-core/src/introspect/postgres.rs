//! PostgreSQL introspection over a short-lived sqlx connection per call.

use super::{DatabaseEngine, DatabaseTarget, SchemaIntrospector};
use crate::error::MaskProfilerError;
use crate::Result;
use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use sqlx::{ConnectOptions, Connection, PgConnection};

const SCHEMAS_SQL: &str = r"
    SELECT nspname
    FROM pg_catalog.pg_namespace
    WHERE nspname NOT LIKE 'pg_%'
      AND nspname != 'information_schema'
    ORDER BY nspname
";

const TABLES_SQL: &str = r"
    SELECT table_name
    FROM information_schema.tables
    WHERE table_schema = $1
      AND table_type = 'BASE TABLE'
    ORDER BY table_name
";

/// PostgreSQL schema/table discovery.
pub struct PostgresIntrospector {
    target: DatabaseTarget,
}

impl PostgresIntrospector {
    pub fn new(target: DatabaseTarget) -> Self {
        Self { target }
    }

    async fn connect(&self) -> Result<PgConnection> {
        let options = PgConnectOptions::new()
            .host(&self.target.host)
            .port(self.target.port)
            .database(self.target.database().unwrap_or("postgres"))
            .username(&self.target.username)
            .password(self.target.password.expose());

        options
            .connect()
            .await
            .map_err(|e| MaskProfilerError::connection_failed(self.target.to_string(), e))
    }
}

#[async_trait]
impl SchemaIntrospector for PostgresIntrospector {
    fn engine(&self) -> DatabaseEngine {
        DatabaseEngine::Postgres
    }

    async fn list_schemas(&self) -> Result<Vec<String>> {
        tracing::info!("Discovering schemas from PostgreSQL ({})", self.target);
        let mut conn = self.connect().await?;

        let schemas: Vec<String> = sqlx::query_scalar(SCHEMAS_SQL)
            .fetch_all(&mut conn)
            .await
            .map_err(|e| {
                MaskProfilerError::query_failed("Failed to enumerate PostgreSQL schemas", e)
            })?;

        conn.close().await.ok();

        if schemas.is_empty() {
            tracing::info!("No eligible schemas found");
        } else {
            tracing::info!("Schemas found: {}", schemas.join(" "));
        }
        Ok(schemas)
    }

    async fn list_tables(&self, schema: &str) -> Result<Vec<String>> {
        tracing::info!("Discovering tables for schema '{schema}'");
        let mut conn = self.connect().await?;

        let tables: Vec<String> = sqlx::query_scalar(TABLES_SQL)
            .bind(schema)
            .fetch_all(&mut conn)
            .await
            .map_err(|e| {
                MaskProfilerError::query_failed(
                    format!("Failed to enumerate tables for schema '{schema}'"),
                    e,
                )
            })?;

        conn.close().await.ok();

        tracing::info!("Found {} table(s) in '{schema}'", tables.len());
        Ok(tables)
    }
}
