//! Reconciles discovered schemas into connector/ruleset/profile-job triples.
//!
//! Application and environment are ensured up front; without them nothing
//! downstream is addressable, so their failures abort the run. Each schema
//! is then provisioned independently: a remote failure for one schema is
//! logged and recorded, and the run continues with the next schema.
//! Introspection connection failures and authentication failures propagate
//! unmodified.

use crate::error::MaskProfilerError;
use crate::introspect::{DatabaseEngine, DatabaseTarget, SchemaIntrospector};
use crate::remote::{connector_name, MaskingApi};
use crate::Result;

/// Which schemas a provisioning run covers.
#[derive(Debug, Clone)]
pub enum SchemaScope {
    /// Every non-system schema the introspector discovers.
    All,
    /// One named schema; it must be present in the discovered set.
    Single(String),
}

/// Per-schema provisioning result.
#[derive(Debug, Clone)]
pub struct SchemaOutcome {
    pub schema: String,
    pub connector_id: Option<i64>,
    pub ruleset_id: Option<i64>,
    pub profile_job_id: Option<i64>,
    pub table_count: usize,
    pub error: Option<String>,
}

impl SchemaOutcome {
    fn failed(schema: &str, error: String) -> Self {
        Self {
            schema: schema.to_string(),
            connector_id: None,
            ruleset_id: None,
            profile_job_id: None,
            table_count: 0,
            error: Some(error),
        }
    }
}

/// Result of one provisioning run.
#[derive(Debug, Clone)]
pub struct ProvisioningReport {
    pub application_id: i64,
    pub environment_id: i64,
    pub schemas: Vec<SchemaOutcome>,
}

impl ProvisioningReport {
    /// Schemas that did not get a complete connector/ruleset/job triple.
    pub fn failed_schemas(&self) -> impl Iterator<Item = &SchemaOutcome> {
        self.schemas
            .iter()
            .filter(|s| s.error.is_some() || s.profile_job_id.is_none())
    }
}

/// Drives one introspector and one masking-engine session to converge an
/// environment on the discovered schema set.
pub struct ProvisioningPipeline<'a, C: MaskingApi + ?Sized> {
    api: &'a C,
    introspector: &'a dyn SchemaIntrospector,
    target: &'a DatabaseTarget,
    profile_set_id: i64,
}

impl<'a, C: MaskingApi + ?Sized> ProvisioningPipeline<'a, C> {
    pub fn new(
        api: &'a C,
        introspector: &'a dyn SchemaIntrospector,
        target: &'a DatabaseTarget,
        profile_set_id: i64,
    ) -> Self {
        Self {
            api,
            introspector,
            target,
            profile_set_id,
        }
    }

    /// Runs the full reconciliation for one application/environment pair.
    ///
    /// # Errors
    /// Ensure failures for the application or environment, introspection
    /// failures, authentication failures, and an unknown schema in
    /// [`SchemaScope::Single`] are fatal. Remote failures while provisioning
    /// an individual schema are recorded in the report instead.
    pub async fn run(
        &self,
        application: &str,
        environment: &str,
        scope: &SchemaScope,
    ) -> Result<ProvisioningReport> {
        let application_id = self.api.ensure_application(application).await?;
        let environment_id = self
            .api
            .ensure_environment(application_id, environment)
            .await?;

        let discovered = self.introspector.list_schemas().await?;
        let schemas = match scope {
            SchemaScope::All => discovered,
            SchemaScope::Single(schema) => {
                // Oracle owner names are uppercase in the catalog
                let schema = if self.introspector.engine() == DatabaseEngine::Oracle {
                    schema.to_uppercase()
                } else {
                    schema.clone()
                };
                if !discovered.iter().any(|s| *s == schema) {
                    return Err(MaskProfilerError::not_found(format!(
                        "schema '{schema}' in {}",
                        self.target
                    )));
                }
                vec![schema]
            }
        };

        let mut outcomes = Vec::with_capacity(schemas.len());
        for schema in &schemas {
            match self.provision_schema(environment_id, schema).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(err @ MaskProfilerError::Remote { .. }) => {
                    tracing::error!(
                        "Provisioning failed for schema '{schema}': {err}; continuing with next schema"
                    );
                    outcomes.push(SchemaOutcome::failed(schema, err.to_string()));
                }
                Err(other) => return Err(other),
            }
        }

        Ok(ProvisioningReport {
            application_id,
            environment_id,
            schemas: outcomes,
        })
    }

    async fn provision_schema(&self, environment_id: i64, schema: &str) -> Result<SchemaOutcome> {
        tracing::info!("Provisioning schema '{schema}'");
        let name = connector_name(schema);

        let connector_id = match self.api.find_connector_by_name(environment_id, &name).await? {
            Some(id) => {
                tracing::info!("Reusing existing connector '{name}' (ID={id})");
                id
            }
            None => {
                self.api
                    .create_connector(environment_id, &name, schema, self.target)
                    .await?
            }
        };

        let ruleset_id = self.api.create_ruleset(connector_id, schema).await?;

        let tables = self.introspector.list_tables(schema).await?;
        self.api.sync_ruleset_tables(ruleset_id, &tables).await?;

        let profile_job_id = self
            .api
            .create_profile_job(ruleset_id, schema, self.profile_set_id)
            .await?;
        if profile_job_id.is_none() {
            tracing::warn!("No profile job for schema '{schema}'; continuing");
        }

        Ok(SchemaOutcome {
            schema: schema.to_string(),
            connector_id: Some(connector_id),
            ruleset_id: Some(ruleset_id),
            profile_job_id,
            table_count: tables.len(),
            error: None,
        })
    }
}
