//! HTTP client for the masking engine REST API.
//!
//! A session is created by [`ComplianceClient::login`]; the auth token is
//! immutable for the client's lifetime and threaded into every request
//! header. Expired tokens surface as `Authentication` errors and callers
//! log in again for a fresh client.

use super::models::{
    Application, BulkTableUpdateTask, ConnectorSummary, Environment, ExecutionState, ProfileJob,
    ProfileJobCreated, ProfileSet, ResponseList, RulesetCreated,
};
use super::{ruleset_name, MaskingApi};
use crate::error::MaskProfilerError;
use crate::introspect::{DatabaseTarget, EngineTarget, OracleConnect};
use crate::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(rename = "Authorization")]
    authorization: Option<String>,
}

/// Authenticated session against one masking engine.
pub struct ComplianceClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl ComplianceClient {
    /// Logs in and returns a ready-to-use session.
    ///
    /// `insecure` disables TLS certificate verification for engines running
    /// with self-signed certificates.
    ///
    /// # Errors
    /// `Connection` if the engine is unreachable, `Authentication` on bad
    /// credentials, `Remote` on any other non-2xx response.
    pub async fn login(
        base_url: &str,
        api_version: &str,
        username: &str,
        password: &str,
        insecure: bool,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(|e| MaskProfilerError::connection_failed("building HTTP client", e))?;

        let api_base = format!("{}/masking/api/{api_version}", base_url.trim_end_matches('/'));
        let url = format!("{api_base}/login");

        tracing::info!(
            "Logging in to {} as '{username}'",
            crate::error::redact_database_url(&api_base)
        );
        let resp = http
            .post(&url)
            .json(&json!({"username": username, "password": password}))
            .send()
            .await
            .map_err(|e| MaskProfilerError::connection_failed(url.clone(), e))?;

        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        if !(200..300).contains(&status) {
            return Err(MaskProfilerError::remote(status, body));
        }

        let login: LoginResponse = serde_json::from_str(&body)
            .map_err(|e| MaskProfilerError::remote(status, format!("undecodable login response: {e}")))?;
        let token = login.authorization.ok_or_else(|| {
            MaskProfilerError::remote(status, "login did not return an Authorization token")
        })?;

        tracing::info!("Login successful");
        Ok(Self {
            http,
            api_base,
            token,
        })
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(MaskProfilerError::remote(status.as_u16(), body))
        }
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status().as_u16();
        resp.json::<T>()
            .await
            .map_err(|e| MaskProfilerError::remote(status, format!("undecodable response body: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{path}", self.api_base);
        let resp = self
            .http
            .get(&url)
            .query(params)
            .header("Authorization", &self.token)
            .send()
            .await
            .map_err(|e| MaskProfilerError::connection_failed(url, e))?;
        Self::decode(Self::check(resp).await?).await
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        let url = format!("{}{path}", self.api_base);
        let resp = self
            .http
            .post(&url)
            .json(body)
            .header("Authorization", &self.token)
            .send()
            .await
            .map_err(|e| MaskProfilerError::connection_failed(url, e))?;
        Self::decode(Self::check(resp).await?).await
    }

    async fn put_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        let url = format!("{}{path}", self.api_base);
        let resp = self
            .http
            .put(&url)
            .json(body)
            .header("Authorization", &self.token)
            .send()
            .await
            .map_err(|e| MaskProfilerError::connection_failed(url, e))?;
        Self::decode(Self::check(resp).await?).await
    }

    async fn delete_path(&self, path: &str) -> Result<()> {
        let url = format!("{}{path}", self.api_base);
        let resp = self
            .http
            .delete(&url)
            .header("Authorization", &self.token)
            .send()
            .await
            .map_err(|e| MaskProfilerError::connection_failed(url, e))?;
        Self::check(resp).await?;
        Ok(())
    }
}

/// Engine-specific connector create payload.
///
/// Oracle SID targets use the engine's native host/port/sid fields; Oracle
/// SERVICE_NAME targets go through a thin-driver JDBC URL since the native
/// payload cannot express a service name. The other engines use their
/// builtin driver ids.
fn connector_payload(env_id: i64, name: &str, schema: &str, target: &DatabaseTarget) -> Value {
    match &target.engine {
        EngineTarget::Oracle {
            connect: OracleConnect::Sid(sid),
        } => json!({
            "connectorName": name,
            "databaseType": "ORACLE",
            "environmentId": env_id,
            "host": target.host,
            "port": target.port,
            "schemaName": schema,
            "sid": sid,
            "username": target.username,
            "password": target.password.expose(),
        }),
        EngineTarget::Oracle {
            connect: OracleConnect::ServiceName(service),
        } => json!({
            "connectorName": name,
            "databaseType": "ORACLE",
            "environmentId": env_id,
            "jdbc": format!("jdbc:oracle:thin:@//{}:{}/{service}", target.host, target.port),
            "schemaName": schema,
            "username": target.username,
            "password": target.password.expose(),
            "kerberosAuth": false,
            "jdbcDriverId": 1,
            "enableLogger": false,
            "passwordVaultAuth": false,
        }),
        EngineTarget::Mssql { database } => json!({
            "connectorName": name,
            "databaseType": "MSSQL",
            "environmentId": env_id,
            "databaseName": database,
            "host": target.host,
            "port": target.port,
            "schemaName": schema,
            "username": target.username,
            "password": target.password.expose(),
            "kerberosAuth": false,
            "jdbcDriverId": 2,
            "enableLogger": false,
            "passwordVaultAuth": false,
        }),
        EngineTarget::MySql { database } => json!({
            "connectorName": name,
            "databaseType": "MYSQL",
            "environmentId": env_id,
            "databaseName": database,
            "host": target.host,
            "port": target.port,
            "schemaName": schema,
            "username": target.username,
            "password": target.password.expose(),
            "kerberosAuth": false,
            "jdbcDriverId": 3,
            "enableLogger": false,
            "passwordVaultAuth": false,
        }),
        EngineTarget::Postgres { database } => json!({
            "connectorName": name,
            "databaseType": "POSTGRES",
            "environmentId": env_id,
            "databaseName": database,
            "host": target.host,
            "port": target.port,
            "schemaName": schema,
            "username": target.username,
            "password": target.password.expose(),
            "kerberosAuth": false,
            "jdbcDriverId": 5,
            "enableLogger": false,
            "passwordVaultAuth": false,
        }),
    }
}

#[async_trait]
impl MaskingApi for ComplianceClient {
    async fn list_applications(&self) -> Result<Vec<Application>> {
        tracing::debug!("Fetching applications");
        let list: ResponseList<Application> = self
            .get_json("/applications", &[("page_number", "1".to_string())])
            .await?;
        let mut apps = list.response_list;
        apps.sort_by_key(|a| a.application_id);
        Ok(apps)
    }

    async fn create_application(&self, name: &str) -> Result<i64> {
        let created: Application = self
            .post_json("/applications", &json!({"applicationName": name}))
            .await?;
        Ok(created.application_id)
    }

    async fn delete_application(&self, app_id: i64) -> Result<()> {
        tracing::info!("Deleting application ID={app_id}");
        self.delete_path(&format!("/applications/{app_id}")).await
    }

    async fn list_environments(&self, app_id: i64) -> Result<Vec<Environment>> {
        tracing::debug!("Fetching environments for applicationId={app_id}");
        let list: ResponseList<Environment> = self
            .get_json(
                "/environments",
                &[
                    ("page_number", "1".to_string()),
                    ("application_id", app_id.to_string()),
                ],
            )
            .await?;
        let mut envs = list.response_list;
        envs.sort_by_key(|e| e.environment_id);
        Ok(envs)
    }

    async fn create_environment(&self, app_id: i64, name: &str) -> Result<i64> {
        let created: Environment = self
            .post_json(
                "/environments",
                &json!({
                    "environmentName": name,
                    "applicationId": app_id,
                    "purpose": "MASK",
                }),
            )
            .await?;
        Ok(created.environment_id)
    }

    async fn delete_environment(&self, env_id: i64) -> Result<()> {
        tracing::info!("Deleting environment ID={env_id}");
        self.delete_path(&format!("/environments/{env_id}")).await
    }

    async fn list_profile_sets(&self) -> Result<Vec<ProfileSet>> {
        tracing::debug!("Fetching profile sets");
        let list: ResponseList<ProfileSet> = self
            .get_json("/profile-sets", &[("page_number", "1".to_string())])
            .await?;
        let mut sets = list.response_list;
        sets.sort_by_key(|s| s.profile_set_id);
        Ok(sets)
    }

    async fn list_connectors(&self, env_id: i64) -> Result<Vec<ConnectorSummary>> {
        tracing::debug!("Fetching connectors for environmentId={env_id}");
        let list: ResponseList<ConnectorSummary> = self
            .get_json(
                "/database-connectors",
                &[
                    ("page_number", "1".to_string()),
                    ("environment_id", env_id.to_string()),
                ],
            )
            .await?;
        let mut connectors = list.response_list;
        connectors.sort_by_key(|c| c.database_connector_id);
        Ok(connectors)
    }

    async fn create_connector(
        &self,
        env_id: i64,
        name: &str,
        schema: &str,
        target: &DatabaseTarget,
    ) -> Result<i64> {
        tracing::info!("Creating {} connector '{name}'", target.engine());
        let payload = connector_payload(env_id, name, schema, target);
        let created: ConnectorSummary = self.post_json("/database-connectors", &payload).await?;
        tracing::info!(
            "Connector '{name}' created. ID={}",
            created.database_connector_id
        );
        Ok(created.database_connector_id)
    }

    async fn create_ruleset(&self, connector_id: i64, schema: &str) -> Result<i64> {
        let name = ruleset_name(schema);
        tracing::info!("Creating ruleset '{name}' for connectorId={connector_id}");
        let created: RulesetCreated = self
            .post_json(
                "/database-rulesets",
                &json!({
                    "rulesetName": name,
                    "databaseConnectorId": connector_id,
                }),
            )
            .await?;
        tracing::info!("Ruleset created. ID={}", created.database_ruleset_id);
        Ok(created.database_ruleset_id)
    }

    async fn bulk_add_tables(&self, ruleset_id: i64, tables: &[String]) -> Result<()> {
        let table_metadata: Vec<Value> = tables
            .iter()
            .map(|t| json!({"tableName": t, "rulesetId": ruleset_id}))
            .collect();
        let task: BulkTableUpdateTask = self
            .put_json(
                &format!("/database-rulesets/{ruleset_id}/bulk-table-update"),
                &json!({"tableMetadata": table_metadata}),
            )
            .await?;
        tracing::info!(
            "Bulk table update submitted for ruleset {ruleset_id}, asyncTaskId={:?}",
            task.async_task_id
        );
        Ok(())
    }

    async fn create_profile_job(
        &self,
        ruleset_id: i64,
        schema: &str,
        profile_set_id: i64,
    ) -> Result<Option<i64>> {
        let name = super::profile_job_name(schema);
        tracing::info!(
            "Creating profile job '{name}' (rulesetId={ruleset_id}, profileSetId={profile_set_id})"
        );
        let created: ProfileJobCreated = self
            .post_json(
                "/profile-jobs",
                &json!({
                    "jobName": name,
                    "profileSetId": profile_set_id,
                    "rulesetId": ruleset_id,
                    "jobDescription":
                        format!("Profile job for schema {schema}, ruleset {}", ruleset_name(schema)),
                }),
            )
            .await?;

        match created.profile_job_id {
            Some(job_id) => {
                tracing::info!("Profile job created. ID={job_id}");
                Ok(Some(job_id))
            }
            None => {
                tracing::warn!("Engine returned no job id for profile job '{name}'");
                Ok(None)
            }
        }
    }

    async fn list_profile_jobs(&self, env_id: i64) -> Result<Vec<ProfileJob>> {
        tracing::debug!("Fetching profile jobs for environmentId={env_id}");
        let list: ResponseList<ProfileJob> = self
            .get_json(
                "/profile-jobs",
                &[
                    ("page_number", "1".to_string()),
                    ("environment_id", env_id.to_string()),
                ],
            )
            .await?;
        let mut jobs = list.response_list;
        jobs.sort_by_key(|j| j.profile_job_id);
        Ok(jobs)
    }

    async fn start_execution(&self, job_id: i64) -> Result<i64> {
        tracing::info!("Starting execution for profile jobId={job_id}");
        let state: ExecutionState = self
            .post_json("/executions", &json!({"jobId": job_id}))
            .await?;
        tracing::info!(
            "Execution started. executionId={}, initial status={}",
            state.execution_id,
            state.status
        );
        Ok(state.execution_id)
    }

    async fn execution_status(&self, execution_id: i64) -> Result<ExecutionState> {
        self.get_json(&format!("/executions/{execution_id}"), &[])
            .await
    }
}
