//! Oracle introspection via the blocking `oracle` driver.
//!
//! Driver calls run inside `spawn_blocking`; one connection is opened and
//! closed around each discovery call. The SID/SERVICE_NAME choice is already
//! validated by [`OracleConnect`](super::OracleConnect) construction.

use super::{DatabaseEngine, DatabaseTarget, OracleConnect, SchemaIntrospector};
use crate::error::MaskProfilerError;
use crate::Result;
use async_trait::async_trait;

/// Known Oracle system and sample-schema owners, excluded from discovery.
const ORACLE_SYSTEM_SCHEMAS: &[&str] = &[
    "ANONYMOUS",
    "APEX_040000",
    "APEX_040200",
    "APEX_050000",
    "APEX_050100",
    "APEX_PUBLIC_USER",
    "APPQOSSYS",
    "AUDSYS",
    "CTXSYS",
    "DBSNMP",
    "DIP",
    "DVF",
    "DVSYS",
    "EXFSYS",
    "FLOWS_FILES",
    "GSMADMIN_INTERNAL",
    "GSMCATUSER",
    "GSMUSER",
    "HR",
    "IX",
    "LBACSYS",
    "MDDATA",
    "MDSYS",
    "OE",
    "OLAPSYS",
    "OPS$ORACLE",
    "ORACLE_OCM",
    "ORDDATA",
    "ORDPLUGINS",
    "ORDSYS",
    "OUTLN",
    "OWBSYS",
    "PM",
    "SCOTT",
    "SH",
    "SI_INFORMTN_SCHEMA",
    "SPATIAL_CSW_ADMIN_USR",
    "SPATIAL_WFS_ADMIN_USR",
    "SYS",
    "SYSBACKUP",
    "SYSDG",
    "SYSKM",
    "SYSMAN",
    "SYSTEM",
    "WKPROXY",
    "WKSYS",
    "WK_TEST",
    "WMSYS",
    "XDB",
    "XS$NULL",
];

const SCHEMAS_SQL: &str = r"
    SELECT DISTINCT OWNER
    FROM ALL_TABLES
    ORDER BY OWNER
";

const TABLES_SQL: &str = r"
    SELECT TABLE_NAME
    FROM ALL_TABLES
    WHERE OWNER = :owner
    ORDER BY TABLE_NAME
";

/// Oracle schema/table discovery.
pub struct OracleIntrospector {
    target: DatabaseTarget,
}

impl OracleIntrospector {
    pub fn new(target: DatabaseTarget) -> Self {
        Self { target }
    }

    /// Easy-connect string for SERVICE_NAME targets, full descriptor for SID
    /// targets (easy connect cannot express a SID).
    fn connect_string(&self) -> String {
        match &self.target.engine {
            super::EngineTarget::Oracle {
                connect: OracleConnect::ServiceName(service),
            } => format!("//{}:{}/{}", self.target.host, self.target.port, service),
            super::EngineTarget::Oracle {
                connect: OracleConnect::Sid(sid),
            } => format!(
                "(DESCRIPTION=(ADDRESS=(PROTOCOL=TCP)(HOST={})(PORT={}))(CONNECT_DATA=(SID={sid})))",
                self.target.host, self.target.port
            ),
            _ => String::new(),
        }
    }
}

fn filter_system_schemas(owners: Vec<String>) -> Vec<String> {
    owners
        .into_iter()
        .filter(|owner| !ORACLE_SYSTEM_SCHEMAS.contains(&owner.as_str()))
        .collect()
}

#[async_trait]
impl SchemaIntrospector for OracleIntrospector {
    fn engine(&self) -> DatabaseEngine {
        DatabaseEngine::Oracle
    }

    async fn list_schemas(&self) -> Result<Vec<String>> {
        tracing::info!("Discovering schemas from Oracle ({})", self.target);
        let target = self.target.clone();
        let connect_string = self.connect_string();

        let schemas = tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
            let conn = oracle::Connection::connect(
                &target.username,
                target.password.expose(),
                &connect_string,
            )
            .map_err(|e| MaskProfilerError::connection_failed(target.to_string(), e))?;

            let rows = conn.query_as::<String>(SCHEMAS_SQL, &[]).map_err(|e| {
                MaskProfilerError::query_failed("Failed to enumerate Oracle schemas", e)
            })?;

            let mut owners = Vec::new();
            for row in rows {
                let owner = row.map_err(|e| {
                    MaskProfilerError::query_failed("Failed to read Oracle schema row", e)
                })?;
                owners.push(owner);
            }
            conn.close().ok();
            Ok(filter_system_schemas(owners))
        })
        .await
        .map_err(|e| MaskProfilerError::query_failed("Oracle introspection task failed", e))??;

        if schemas.is_empty() {
            tracing::info!("No eligible schemas found");
        } else {
            tracing::info!("Schemas found: {}", schemas.join(" "));
        }
        Ok(schemas)
    }

    async fn list_tables(&self, schema: &str) -> Result<Vec<String>> {
        tracing::info!("Discovering tables for schema '{schema}'");
        let target = self.target.clone();
        let connect_string = self.connect_string();
        let owner = schema.to_string();

        let tables = tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
            let conn = oracle::Connection::connect(
                &target.username,
                target.password.expose(),
                &connect_string,
            )
            .map_err(|e| MaskProfilerError::connection_failed(target.to_string(), e))?;

            let rows = conn.query_as::<String>(TABLES_SQL, &[&owner]).map_err(|e| {
                MaskProfilerError::query_failed(
                    format!("Failed to enumerate tables for schema '{owner}'"),
                    e,
                )
            })?;

            let mut tables = Vec::new();
            for row in rows {
                let table = row.map_err(|e| {
                    MaskProfilerError::query_failed("Failed to read Oracle table row", e)
                })?;
                tables.push(table);
            }
            conn.close().ok();
            Ok(tables)
        })
        .await
        .map_err(|e| MaskProfilerError::query_failed("Oracle introspection task failed", e))??;

        tracing::info!("Found {} table(s) in '{schema}'", tables.len());
        Ok(tables)
    }
}
