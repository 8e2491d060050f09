//! Core provisioning and execution logic for maskprofiler.
//!
//! This crate automates the metadata side of data masking: it introspects a
//! source database (Oracle, SQL Server, MySQL, or PostgreSQL), reconciles
//! each discovered schema into an application/environment/connector/ruleset/
//! profile-job hierarchy on a remote compliance engine, and drives profile-job
//! executions to completion with bounded parallelism.
//!
//! # Security Guarantees
//! - Database and engine credentials never appear in logs or error messages
//! - All database operations are read-only catalog queries
//! - Passwords are held in zeroizing wrappers and wiped on drop
//!
//! # Architecture
//! - [`introspect::SchemaIntrospector`]: one adapter per engine behind an
//!   object-safe trait, selected by [`introspect::create_introspector`]
//! - [`remote::MaskingApi`]: typed façade over the engine's REST resources,
//!   with ensure-or-create idempotency carried by the trait itself
//! - [`provision::ProvisioningPipeline`]: per-schema reconciliation with
//!   partial-failure isolation
//! - [`scheduler::JobExecutionScheduler`]: admission-controlled submission
//!   and polling of job executions

pub mod error;
pub mod introspect;
pub mod logging;
pub mod provision;
pub mod remote;
pub mod scheduler;

// Re-export commonly used types
pub use error::{MaskProfilerError, Result};
pub use introspect::{
    create_introspector, DatabaseEngine, DatabaseTarget, EngineTarget, OracleConnect,
    SchemaIntrospector, Secret,
};
pub use logging::init_logging;
pub use provision::{ProvisioningPipeline, ProvisioningReport, SchemaScope};
pub use remote::{ComplianceClient, ExecutionStatus, MaskingApi, ProfileJob};
pub use scheduler::{JobExecutionScheduler, JobOutcome, DEFAULT_POLL_INTERVAL};
