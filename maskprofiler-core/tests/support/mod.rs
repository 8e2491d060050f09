//! In-memory test doubles for the masking engine and the introspector.

#![allow(clippy::unwrap_used)]
#![allow(dead_code)]

use async_trait::async_trait;
use maskprofiler_core::introspect::{DatabaseEngine, DatabaseTarget, EngineTarget, Secret};
use maskprofiler_core::remote::models::{
    Application, ConnectorSummary, Environment, ExecutionState, ExecutionStatus, ProfileJob,
    ProfileSet,
};
use maskprofiler_core::remote::MaskingApi;
use maskprofiler_core::{MaskProfilerError, Result, SchemaIntrospector};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Postgres target with placeholder credentials.
pub fn test_target() -> DatabaseTarget {
    DatabaseTarget {
        host: "dbhost".to_string(),
        port: 5432,
        username: "masker".to_string(),
        password: Secret::from("hunter2"),
        engine: EngineTarget::Postgres {
            database: "appdb".to_string(),
        },
    }
}

/// Canned schema/table inventory.
pub struct StaticIntrospector {
    pub engine: DatabaseEngine,
    pub schemas: Vec<String>,
    pub tables: HashMap<String, Vec<String>>,
}

impl StaticIntrospector {
    pub fn new(schemas: &[&str]) -> Self {
        Self {
            engine: DatabaseEngine::Postgres,
            schemas: schemas.iter().map(ToString::to_string).collect(),
            tables: HashMap::new(),
        }
    }

    pub fn with_engine(mut self, engine: DatabaseEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_tables(mut self, schema: &str, tables: &[&str]) -> Self {
        self.tables.insert(
            schema.to_string(),
            tables.iter().map(ToString::to_string).collect(),
        );
        self
    }
}

#[async_trait]
impl SchemaIntrospector for StaticIntrospector {
    fn engine(&self) -> DatabaseEngine {
        self.engine
    }

    async fn list_schemas(&self) -> Result<Vec<String>> {
        Ok(self.schemas.clone())
    }

    async fn list_tables(&self, schema: &str) -> Result<Vec<String>> {
        Ok(self.tables.get(schema).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
struct EngineState {
    applications: Vec<Application>,
    environments: Vec<(i64, Environment)>,
    connectors: Vec<(i64, ConnectorSummary)>,
    rulesets: Vec<(i64, String)>,
    jobs: Vec<(i64, ProfileJob)>,
    calls: Vec<String>,
    next_id: i64,
    fail_connector_schemas: Vec<String>,
    auth_fail_connector_schemas: Vec<String>,
    scripts: HashMap<i64, VecDeque<ExecutionStatus>>,
    executions: HashMap<i64, i64>,
    submissions: Vec<i64>,
    in_flight: usize,
    max_in_flight: usize,
}

/// Scriptable in-memory masking engine.
///
/// Records every call by name so tests can assert how many remote round
/// trips a contract performs, tracks execution submissions and the peak
/// number of in-flight executions.
pub struct FakeEngine {
    state: Mutex<EngineState>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(EngineState {
                next_id: 1000,
                ..EngineState::default()
            }),
        }
    }

    /// Pre-registers a profile job in environment `env_id`.
    pub fn seed_job(&self, env_id: i64, job_id: i64, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.jobs.push((
            env_id,
            ProfileJob {
                profile_job_id: job_id,
                job_name: name.to_string(),
            },
        ));
    }

    pub fn seed_connector(&self, env_id: i64, connector_id: i64, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.connectors.push((
            env_id,
            ConnectorSummary {
                database_connector_id: connector_id,
                connector_name: name.to_string(),
            },
        ));
    }

    /// Connector creation for this schema fails with a remote 500.
    pub fn fail_connector_for(&self, schema: &str) {
        let mut state = self.state.lock().unwrap();
        state.fail_connector_schemas.push(schema.to_string());
    }

    /// Connector creation for this schema fails with a 401 (rejected token).
    pub fn fail_connector_auth_for(&self, schema: &str) {
        let mut state = self.state.lock().unwrap();
        state.auth_fail_connector_schemas.push(schema.to_string());
    }

    /// Statuses served for the job's execution, one per poll. The last
    /// status keeps being served once the script runs out.
    pub fn script_execution(&self, job_id: i64, statuses: &[ExecutionStatus]) {
        let mut state = self.state.lock().unwrap();
        state.scripts.insert(job_id, statuses.iter().copied().collect());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.starts_with(name))
            .count()
    }

    /// Job ids in order of `start_execution` calls.
    pub fn submission_order(&self) -> Vec<i64> {
        self.state.lock().unwrap().submissions.clone()
    }

    /// Peak number of executions between submission and an observed
    /// terminal status.
    pub fn max_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_in_flight
    }

    pub fn ruleset_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .rulesets
            .iter()
            .map(|(_, name)| name.clone())
            .collect()
    }

    pub fn job_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .jobs
            .iter()
            .map(|(_, job)| job.job_name.clone())
            .collect()
    }
}

#[async_trait]
impl MaskingApi for FakeEngine {
    async fn list_applications(&self) -> Result<Vec<Application>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("list_applications".to_string());
        Ok(state.applications.clone())
    }

    async fn create_application(&self, name: &str) -> Result<i64> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("create_application:{name}"));
        state.next_id += 1;
        let id = state.next_id;
        state.applications.push(Application {
            application_id: id,
            application_name: name.to_string(),
        });
        Ok(id)
    }

    async fn delete_application(&self, app_id: i64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("delete_application:{app_id}"));
        state.applications.retain(|a| a.application_id != app_id);
        Ok(())
    }

    async fn list_environments(&self, app_id: i64) -> Result<Vec<Environment>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("list_environments:{app_id}"));
        Ok(state
            .environments
            .iter()
            .filter(|(owner, _)| *owner == app_id)
            .map(|(_, env)| env.clone())
            .collect())
    }

    async fn create_environment(&self, app_id: i64, name: &str) -> Result<i64> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("create_environment:{name}"));
        state.next_id += 1;
        let id = state.next_id;
        state.environments.push((
            app_id,
            Environment {
                environment_id: id,
                environment_name: name.to_string(),
            },
        ));
        Ok(id)
    }

    async fn delete_environment(&self, env_id: i64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("delete_environment:{env_id}"));
        state
            .environments
            .retain(|(_, env)| env.environment_id != env_id);
        Ok(())
    }

    async fn list_profile_sets(&self) -> Result<Vec<ProfileSet>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("list_profile_sets".to_string());
        Ok(Vec::new())
    }

    async fn list_connectors(&self, env_id: i64) -> Result<Vec<ConnectorSummary>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("list_connectors:{env_id}"));
        Ok(state
            .connectors
            .iter()
            .filter(|(owner, _)| *owner == env_id)
            .map(|(_, conn)| conn.clone())
            .collect())
    }

    async fn create_connector(
        &self,
        env_id: i64,
        name: &str,
        schema: &str,
        _target: &DatabaseTarget,
    ) -> Result<i64> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("create_connector:{name}"));
        if state.auth_fail_connector_schemas.iter().any(|s| s == schema) {
            return Err(MaskProfilerError::remote(401, "token rejected"));
        }
        if state.fail_connector_schemas.iter().any(|s| s == schema) {
            return Err(MaskProfilerError::remote(
                500,
                format!("connector rejected for schema {schema}"),
            ));
        }
        state.next_id += 1;
        let id = state.next_id;
        state.connectors.push((
            env_id,
            ConnectorSummary {
                database_connector_id: id,
                connector_name: name.to_string(),
            },
        ));
        Ok(id)
    }

    async fn create_ruleset(&self, _connector_id: i64, schema: &str) -> Result<i64> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("create_ruleset:{schema}"));
        state.next_id += 1;
        let id = state.next_id;
        state.rulesets.push((id, format!("RULESET_{schema}")));
        Ok(id)
    }

    async fn bulk_add_tables(&self, ruleset_id: i64, tables: &[String]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("bulk_add_tables:{ruleset_id}:{}", tables.len()));
        Ok(())
    }

    async fn create_profile_job(
        &self,
        _ruleset_id: i64,
        schema: &str,
        _profile_set_id: i64,
    ) -> Result<Option<i64>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("create_profile_job:{schema}"));
        state.next_id += 1;
        let id = state.next_id;
        state.jobs.push((
            0,
            ProfileJob {
                profile_job_id: id,
                job_name: format!("PROFILEJOB_{schema}"),
            },
        ));
        Ok(Some(id))
    }

    async fn list_profile_jobs(&self, env_id: i64) -> Result<Vec<ProfileJob>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("list_profile_jobs:{env_id}"));
        Ok(state
            .jobs
            .iter()
            .filter(|(owner, _)| *owner == env_id)
            .map(|(_, job)| job.clone())
            .collect())
    }

    async fn start_execution(&self, job_id: i64) -> Result<i64> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("start_execution:{job_id}"));
        state.submissions.push(job_id);
        state.next_id += 1;
        let execution_id = state.next_id;
        state.executions.insert(execution_id, job_id);
        state.in_flight += 1;
        state.max_in_flight = state.max_in_flight.max(state.in_flight);
        Ok(execution_id)
    }

    async fn execution_status(&self, execution_id: i64) -> Result<ExecutionState> {
        let mut state = self.state.lock().unwrap();
        let job_id = *state
            .executions
            .get(&execution_id)
            .ok_or_else(|| MaskProfilerError::not_found(format!("execution {execution_id}")))?;

        let status = match state.scripts.get_mut(&job_id) {
            Some(script) if script.len() > 1 => script.pop_front().unwrap(),
            Some(script) => *script.front().unwrap(),
            None => ExecutionStatus::Succeeded,
        };
        if status.is_terminal() {
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        Ok(ExecutionState {
            execution_id,
            job_id: Some(job_id),
            status,
        })
    }
}
