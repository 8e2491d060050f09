//! Typed façade over the masking engine's resource endpoints.
//!
//! [`MaskingApi`] is the seam between orchestration logic and HTTP: the
//! required methods are single round trips implemented by
//! [`client::ComplianceClient`], while the provided methods carry the
//! ensure-or-create and bulk-sync contracts so they hold for any
//! implementation, in-memory test doubles included.

use crate::introspect::DatabaseTarget;
use crate::Result;
use async_trait::async_trait;

pub mod client;
pub mod models;

pub use client::ComplianceClient;
pub use models::{
    Application, ConnectorSummary, Environment, ExecutionState, ExecutionStatus, ProfileJob,
    ProfileSet,
};

/// Resource operations against the masking engine.
///
/// Every call is one synchronous round trip; non-2xx responses surface as
/// `Remote` errors (401/403 as `Authentication`). List results are sorted
/// ascending by numeric id.
#[async_trait]
pub trait MaskingApi: Send + Sync {
    async fn list_applications(&self) -> Result<Vec<Application>>;

    /// Creates an application and returns its id. Not idempotent; use
    /// [`MaskingApi::ensure_application`].
    async fn create_application(&self, name: &str) -> Result<i64>;

    async fn delete_application(&self, app_id: i64) -> Result<()>;

    async fn list_environments(&self, app_id: i64) -> Result<Vec<Environment>>;

    async fn create_environment(&self, app_id: i64, name: &str) -> Result<i64>;

    async fn delete_environment(&self, env_id: i64) -> Result<()>;

    async fn list_profile_sets(&self) -> Result<Vec<ProfileSet>>;

    async fn list_connectors(&self, env_id: i64) -> Result<Vec<ConnectorSummary>>;

    /// Creates a connector for one schema of the target database, with the
    /// engine-specific payload, and returns its id.
    async fn create_connector(
        &self,
        env_id: i64,
        name: &str,
        schema: &str,
        target: &DatabaseTarget,
    ) -> Result<i64>;

    /// Creates ruleset `RULESET_<schema>` under a connector and returns its id.
    async fn create_ruleset(&self, connector_id: i64, schema: &str) -> Result<i64>;

    /// Replaces-or-adds the ruleset's table set in one batched call.
    /// Callers must not pass an empty list; use
    /// [`MaskingApi::sync_ruleset_tables`].
    async fn bulk_add_tables(&self, ruleset_id: i64, tables: &[String]) -> Result<()>;

    /// Creates profile job `PROFILEJOB_<schema>`. `Ok(None)` means the engine
    /// accepted the request but returned no job id; callers treat that as a
    /// non-fatal creation failure.
    async fn create_profile_job(
        &self,
        ruleset_id: i64,
        schema: &str,
        profile_set_id: i64,
    ) -> Result<Option<i64>>;

    async fn list_profile_jobs(&self, env_id: i64) -> Result<Vec<ProfileJob>>;

    async fn start_execution(&self, job_id: i64) -> Result<i64>;

    async fn execution_status(&self, execution_id: i64) -> Result<ExecutionState>;

    /// Returns the id of the application named `name`, creating it if no
    /// application matches (case-sensitive exact match).
    async fn ensure_application(&self, name: &str) -> Result<i64> {
        let apps = self.list_applications().await?;
        if let Some(app) = apps.iter().find(|a| a.application_name == name) {
            tracing::info!(
                "Application '{name}' already exists. ID={}",
                app.application_id
            );
            return Ok(app.application_id);
        }

        tracing::info!("Creating application '{name}'");
        let app_id = self.create_application(name).await?;
        tracing::info!("Application created. ID={app_id}");
        Ok(app_id)
    }

    /// Returns the id of the environment named `name` under `app_id`,
    /// creating it if absent.
    async fn ensure_environment(&self, app_id: i64, name: &str) -> Result<i64> {
        let envs = self.list_environments(app_id).await?;
        if let Some(env) = envs.iter().find(|e| e.environment_name == name) {
            tracing::info!(
                "Environment '{name}' already exists. ID={}",
                env.environment_id
            );
            return Ok(env.environment_id);
        }

        tracing::info!("Creating environment '{name}' for applicationId={app_id}");
        let env_id = self.create_environment(app_id, name).await?;
        tracing::info!("Environment created. ID={env_id}");
        Ok(env_id)
    }

    /// Lookup only; the pipeline decides create-vs-reuse from the result.
    async fn find_connector_by_name(&self, env_id: i64, name: &str) -> Result<Option<i64>> {
        let connectors = self.list_connectors(env_id).await?;
        Ok(connectors
            .iter()
            .find(|c| c.connector_name == name)
            .map(|c| c.database_connector_id))
    }

    /// Bulk-syncs the ruleset's tables; an empty table list is a no-op and
    /// issues no remote call.
    async fn sync_ruleset_tables(&self, ruleset_id: i64, tables: &[String]) -> Result<()> {
        if tables.is_empty() {
            tracing::info!("No tables to add to ruleset {ruleset_id}; skipping bulk update");
            return Ok(());
        }
        tracing::info!("Adding {} table(s) to ruleset {ruleset_id}", tables.len());
        self.bulk_add_tables(ruleset_id, tables).await
    }
}

/// Connector name for one schema, the connector's idempotency key.
pub fn connector_name(schema: &str) -> String {
    format!("CONNECTOR_{schema}")
}

/// Ruleset name for one schema.
pub fn ruleset_name(schema: &str) -> String {
    format!("RULESET_{schema}")
}

/// Profile-job name for one schema.
pub fn profile_job_name(schema: &str) -> String {
    format!("PROFILEJOB_{schema}")
}
