//! SQL Server introspection over tiberius, one TCP connection per call.

use super::{DatabaseEngine, DatabaseTarget, SchemaIntrospector};
use crate::error::MaskProfilerError;
use crate::Result;
use async_trait::async_trait;
use tiberius::{AuthMethod, Client, Config};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

const SCHEMAS_SQL: &str = r"
    SELECT name
    FROM sys.schemas
    WHERE name NOT IN ('sys', 'INFORMATION_SCHEMA')
    ORDER BY name
";

const TABLES_SQL: &str = r"
    SELECT TABLE_NAME
    FROM INFORMATION_SCHEMA.TABLES
    WHERE TABLE_TYPE = 'BASE TABLE' AND TABLE_SCHEMA = @P1
    ORDER BY TABLE_NAME
";

/// SQL Server schema/table discovery.
pub struct MssqlIntrospector {
    target: DatabaseTarget,
}

impl MssqlIntrospector {
    pub fn new(target: DatabaseTarget) -> Self {
        Self { target }
    }

    async fn connect(&self) -> Result<Client<Compat<TcpStream>>> {
        let mut config = Config::new();
        config.host(&self.target.host);
        config.port(self.target.port);
        config.authentication(AuthMethod::sql_server(
            &self.target.username,
            self.target.password.expose(),
        ));
        if let Some(database) = self.target.database() {
            config.database(database);
        }

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| MaskProfilerError::connection_failed(self.target.to_string(), e))?;
        tcp.set_nodelay(true)
            .map_err(|e| MaskProfilerError::connection_failed(self.target.to_string(), e))?;

        Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| MaskProfilerError::connection_failed(self.target.to_string(), e))
    }
}

#[async_trait]
impl SchemaIntrospector for MssqlIntrospector {
    fn engine(&self) -> DatabaseEngine {
        DatabaseEngine::Mssql
    }

    async fn list_schemas(&self) -> Result<Vec<String>> {
        tracing::info!("Discovering schemas from MSSQL ({})", self.target);
        let mut client = self.connect().await?;

        let stream = client
            .query(SCHEMAS_SQL, &[])
            .await
            .map_err(|e| MaskProfilerError::query_failed("Failed to enumerate MSSQL schemas", e))?;
        let rows = stream
            .into_first_result()
            .await
            .map_err(|e| MaskProfilerError::query_failed("Failed to enumerate MSSQL schemas", e))?;

        let mut schemas = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(name) = row.get::<&str, _>(0) {
                schemas.push(name.to_string());
            }
        }

        if schemas.is_empty() {
            tracing::info!("No eligible schemas found");
        } else {
            tracing::info!("Schemas found: {}", schemas.join(" "));
        }
        Ok(schemas)
    }

    async fn list_tables(&self, schema: &str) -> Result<Vec<String>> {
        tracing::info!("Discovering tables for schema '{schema}'");
        let mut client = self.connect().await?;

        let stream = client.query(TABLES_SQL, &[&schema]).await.map_err(|e| {
            MaskProfilerError::query_failed(
                format!("Failed to enumerate tables for schema '{schema}'"),
                e,
            )
        })?;
        let rows = stream.into_first_result().await.map_err(|e| {
            MaskProfilerError::query_failed(
                format!("Failed to enumerate tables for schema '{schema}'"),
                e,
            )
        })?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(name) = row.get::<&str, _>(0) {
                tables.push(name.to_string());
            }
        }

        tracing::info!("Found {} table(s) in '{schema}'", tables.len());
        Ok(tables)
    }
}
