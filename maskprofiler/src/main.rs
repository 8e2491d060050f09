//! Masking-engine provisioning and profile-job execution tool.
//!
//! This binary introspects a source database, provisions the matching
//! application/environment/connector/ruleset/profile-job hierarchy on a
//! remote compliance engine, and runs profile jobs to completion. All
//! values can be supplied through `DBP_*` environment variables for
//! non-interactive use.

use clap::{Args, Parser, Subcommand, ValueEnum};
use maskprofiler_core::{
    create_introspector, init_logging,
    remote::MaskingApi,
    scheduler::DEFAULT_POLL_INTERVAL,
    ComplianceClient, DatabaseTarget, EngineTarget, JobExecutionScheduler, MaskProfilerError,
    OracleConnect, ProvisioningPipeline, SchemaScope, Secret,
};
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "maskprofiler")]
#[command(about = "Provision masking-engine metadata and run profile jobs")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(flatten)]
    pub engine_api: EngineApiArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, help = "Suppress all output except errors")]
    pub quiet: bool,

    /// Log file receiving a copy of every log line
    #[arg(long, env = "DBP_LOG_FILE", default_value = "maskprofiler.log")]
    pub log_file: PathBuf,
}

/// Connection settings for the compliance engine.
#[derive(Args)]
pub struct EngineApiArgs {
    /// Compliance engine base URL
    #[arg(long, env = "DBP_CE_BASE_URL")]
    pub base_url: String,

    /// Compliance engine username
    #[arg(long, env = "DBP_CE_USERNAME")]
    pub username: String,

    /// Compliance engine password
    #[arg(long, env = "DBP_CE_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Masking API version
    #[arg(long, env = "DBP_CE_API_VERSION", default_value = "v5.1.46")]
    pub api_version: String,

    /// Skip TLS certificate verification (self-signed engines)
    #[arg(long, env = "DBP_CE_INSECURE")]
    pub insecure: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum EngineKind {
    Oracle,
    Mssql,
    Mysql,
    Postgres,
}

/// Connection settings for the source database being introspected.
#[derive(Args)]
pub struct DatabaseArgs {
    /// Source database engine
    #[arg(long, value_enum, env = "DBP_DB_ENGINE")]
    pub engine: EngineKind,

    /// Database host
    #[arg(long, env = "DBP_DB_HOST")]
    pub db_host: String,

    /// Database port
    #[arg(long, env = "DBP_DB_PORT")]
    pub db_port: u16,

    /// Database name (MSSQL, MySQL, PostgreSQL)
    #[arg(long, env = "DBP_DB_NAME")]
    pub db_name: Option<String>,

    /// Database user
    #[arg(long, env = "DBP_DB_USER")]
    pub db_user: String,

    /// Database password
    #[arg(long, env = "DBP_DB_PASSWORD", hide_env_values = true)]
    pub db_password: String,

    /// Oracle SID (mutually exclusive with --oracle-service-name)
    #[arg(long, env = "DBP_ORACLE_SID")]
    pub oracle_sid: Option<String>,

    /// Oracle SERVICE_NAME (mutually exclusive with --oracle-sid)
    #[arg(long, env = "DBP_ORACLE_SERVICE_NAME")]
    pub oracle_service_name: Option<String>,
}

impl DatabaseArgs {
    fn target(&self) -> maskprofiler_core::Result<DatabaseTarget> {
        let engine = match self.engine {
            EngineKind::Oracle => EngineTarget::Oracle {
                connect: OracleConnect::from_options(
                    self.oracle_sid.clone(),
                    self.oracle_service_name.clone(),
                )?,
            },
            EngineKind::Mssql => EngineTarget::Mssql {
                database: self.require_db_name()?,
            },
            EngineKind::Mysql => EngineTarget::MySql {
                database: self.require_db_name()?,
            },
            EngineKind::Postgres => EngineTarget::Postgres {
                database: self.require_db_name()?,
            },
        };

        let target = DatabaseTarget {
            host: self.db_host.clone(),
            port: self.db_port,
            username: self.db_user.clone(),
            password: Secret::new(self.db_password.clone()),
            engine,
        };
        target.validate()?;
        Ok(target)
    }

    fn require_db_name(&self) -> maskprofiler_core::Result<String> {
        self.db_name.clone().ok_or_else(|| {
            MaskProfilerError::configuration("--db-name (or DBP_DB_NAME) is required for this engine")
        })
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Provision connectors, rulesets and profile jobs from discovered schemas
    Provision(ProvisionArgs),
    /// Run profile jobs to completion
    Run(RunArgs),
    /// List remote resources or source schemas
    List {
        #[command(subcommand)]
        what: ListCommand,
    },
    /// Delete remote resources
    Delete {
        #[command(subcommand)]
        what: DeleteCommand,
    },
}

#[derive(Args)]
pub struct ProvisionArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,

    /// Application name on the engine
    #[arg(long, env = "DBP_APPLICATION")]
    pub application: String,

    /// Environment name on the engine
    #[arg(long, env = "DBP_ENVIRONMENT")]
    pub environment: String,

    /// Restrict provisioning to one schema (uppercased for Oracle targets)
    #[arg(long)]
    pub schema: Option<String>,

    /// Profile set id used for the created profile jobs
    #[arg(long, env = "DBP_PROFILE_SET_ID")]
    pub profile_set_id: i64,
}

#[derive(Args)]
pub struct RunArgs {
    /// Application name on the engine
    #[arg(long, env = "DBP_APPLICATION")]
    pub application: String,

    /// Environment name on the engine
    #[arg(long, env = "DBP_ENVIRONMENT")]
    pub environment: String,

    /// Run a single profile job instead of all jobs in the environment
    #[arg(long)]
    pub job_id: Option<i64>,

    /// Run jobs one at a time instead of in parallel
    #[arg(long)]
    pub serial: bool,

    /// Upper bound on in-flight executions (default: min(3, job count))
    #[arg(long, env = "DBP_PROFILE_MAX_PARALLEL")]
    pub max_parallel: Option<usize>,
}

#[derive(Subcommand)]
pub enum ListCommand {
    /// Applications on the engine
    Applications,
    /// Environments across all applications
    Environments,
    /// Profile sets available for profiling jobs
    ProfileSets,
    /// Non-system schemas of the source database
    Schemas(DatabaseArgs),
}

#[derive(Subcommand)]
pub enum DeleteCommand {
    /// Delete an application by id
    Application {
        #[arg(long)]
        id: i64,
    },
    /// Delete an environment by id
    Environment {
        #[arg(long)]
        id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(
        cli.global.verbose,
        cli.global.quiet,
        Some(&cli.global.log_file),
    )?;

    let client = ComplianceClient::login(
        &cli.engine_api.base_url,
        &cli.engine_api.api_version,
        &cli.engine_api.username,
        &cli.engine_api.password,
        cli.engine_api.insecure,
    )
    .await?;

    match cli.command {
        Command::Provision(args) => provision(&client, &args).await,
        Command::Run(args) => run_jobs(&client, &args).await,
        Command::List { what } => list(&client, &what).await,
        Command::Delete { what } => delete(&client, &what).await,
    }
}

async fn provision(client: &ComplianceClient, args: &ProvisionArgs) -> anyhow::Result<()> {
    let target = args.database.target()?;
    let introspector = create_introspector(&target)?;

    let scope = match &args.schema {
        Some(schema) => SchemaScope::Single(schema.clone()),
        None => SchemaScope::All,
    };

    let pipeline = ProvisioningPipeline::new(client, introspector.as_ref(), &target, args.profile_set_id);
    let report = pipeline.run(&args.application, &args.environment, &scope).await?;

    println!(
        "Provisioned applicationId={} environmentId={}",
        report.application_id, report.environment_id
    );
    for outcome in &report.schemas {
        match (&outcome.error, outcome.profile_job_id) {
            (Some(err), _) => println!("  {}: FAILED ({err})", outcome.schema),
            (None, Some(job_id)) => println!(
                "  {}: connectorId={} rulesetId={} jobId={job_id} tables={}",
                outcome.schema,
                outcome.connector_id.unwrap_or_default(),
                outcome.ruleset_id.unwrap_or_default(),
                outcome.table_count
            ),
            (None, None) => println!("  {}: provisioned without profile job", outcome.schema),
        }
    }

    let failed = report.failed_schemas().count();
    if failed > 0 {
        warn!("{failed} schema(s) did not get a complete connector/ruleset/job triple");
    }
    Ok(())
}

async fn run_jobs(client: &ComplianceClient, args: &RunArgs) -> anyhow::Result<()> {
    let app_id = client.ensure_application(&args.application).await?;
    let env_id = client.ensure_environment(app_id, &args.environment).await?;

    let jobs = client.list_profile_jobs(env_id).await?;
    if jobs.is_empty() && args.job_id.is_none() {
        info!("No profile jobs found for this environment");
        return Ok(());
    }

    let scheduler = JobExecutionScheduler::with_poll_interval(client, DEFAULT_POLL_INTERVAL);

    let outcomes = if let Some(job_id) = args.job_id {
        vec![scheduler.run_single(job_id, &jobs).await?]
    } else if args.serial {
        info!("Executing all profile jobs serially");
        scheduler.run_serial(&jobs).await?
    } else {
        let max_parallel = args
            .max_parallel
            .filter(|&n| n > 0)
            .unwrap_or_else(|| jobs.len().min(3));
        info!("Executing all profile jobs in parallel (max_parallel={max_parallel})");
        scheduler.run_parallel(&jobs, max_parallel).await?
    };

    let mut failures = 0usize;
    for outcome in &outcomes {
        println!(
            "job {} (executionId={}): {}",
            outcome.job_id, outcome.execution_id, outcome.status
        );
        if outcome.status.is_failure() {
            failures += 1;
        }
    }
    if failures > 0 {
        error!("{failures} profile job(s) failed");
        anyhow::bail!("{failures} profile job(s) did not succeed");
    }
    Ok(())
}

async fn list(client: &ComplianceClient, what: &ListCommand) -> anyhow::Result<()> {
    match what {
        ListCommand::Applications => {
            for app in client.list_applications().await? {
                println!("{}\t{}", app.application_id, app.application_name);
            }
        }
        ListCommand::Environments => {
            for app in client.list_applications().await? {
                for env in client.list_environments(app.application_id).await? {
                    println!(
                        "{}\t{}\t{}\t{}",
                        env.environment_id,
                        env.environment_name,
                        app.application_id,
                        app.application_name
                    );
                }
            }
        }
        ListCommand::ProfileSets => {
            for set in client.list_profile_sets().await? {
                println!("{}\t{}", set.profile_set_id, set.profile_set_name);
            }
        }
        ListCommand::Schemas(database) => {
            let target = database.target()?;
            let introspector = create_introspector(&target)?;
            for schema in introspector.list_schemas().await? {
                println!("{schema}");
            }
        }
    }
    Ok(())
}

async fn delete(client: &ComplianceClient, what: &DeleteCommand) -> anyhow::Result<()> {
    match what {
        DeleteCommand::Application { id } => {
            client.delete_application(*id).await?;
            println!("Application {id} deleted");
        }
        DeleteCommand::Environment { id } => {
            client.delete_environment(*id).await?;
            println!("Environment {id} deleted");
        }
    }
    Ok(())
}
