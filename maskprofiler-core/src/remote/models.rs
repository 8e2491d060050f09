//! Response shapes for the masking engine API.
//!
//! The engine is inconsistent about numeric ids: depending on version it
//! returns them as JSON numbers or as strings. Every id field goes through
//! [`flexible_id`] so both forms deserialize to `i64`.

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use std::fmt;

/// List-call envelope: `{"responseList": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseList<T> {
    #[serde(default = "Vec::new")]
    pub response_list: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(deserialize_with = "flexible_id")]
    pub application_id: i64,
    pub application_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    #[serde(deserialize_with = "flexible_id")]
    pub environment_id: i64,
    pub environment_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorSummary {
    #[serde(deserialize_with = "flexible_id")]
    pub database_connector_id: i64,
    pub connector_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSet {
    #[serde(deserialize_with = "flexible_id")]
    pub profile_set_id: i64,
    pub profile_set_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesetCreated {
    #[serde(deserialize_with = "flexible_id")]
    pub database_ruleset_id: i64,
}

/// Result of the bulk table update; the engine processes it asynchronously.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkTableUpdateTask {
    #[serde(default, deserialize_with = "flexible_id_opt")]
    pub async_task_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileJob {
    #[serde(deserialize_with = "flexible_id")]
    pub profile_job_id: i64,
    pub job_name: String,
}

/// Create response for a profile job. A 2xx body without an id means the
/// engine rejected the job without raising an HTTP error; callers surface
/// that as a non-fatal absence.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileJobCreated {
    #[serde(default, deserialize_with = "flexible_id_opt")]
    pub profile_job_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionState {
    #[serde(deserialize_with = "flexible_id")]
    pub execution_id: i64,
    #[serde(default, deserialize_with = "flexible_id_opt")]
    pub job_id: Option<i64>,
    pub status: ExecutionStatus,
}

/// Remote execution status values.
///
/// `FAILED` and `ERROR` are distinct on the wire but both mean the same
/// thing to the scheduler: terminal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Error,
    Cancelled,
    #[serde(other)]
    Other,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Error | Self::Cancelled)
    }

    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Error | Self::Cancelled)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Error => "ERROR",
            Self::Cancelled => "CANCELLED",
            Self::Other => "UNKNOWN",
        })
    }
}

fn flexible_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    struct IdVisitor;

    impl Visitor<'_> for IdVisitor {
        type Value = i64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an integer id, as a number or a string")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            i64::try_from(v).map_err(|_| E::custom(format!("id {v} out of range")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
            v.parse()
                .map_err(|_| E::custom(format!("invalid id string '{v}'")))
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

fn flexible_id_opt<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "flexible_id")] i64);

    Option::<Wrapper>::deserialize(deserializer).map(|opt| opt.map(|w| w.0))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_accept_numbers_and_strings() {
        let numeric: Application =
            serde_json::from_str(r#"{"applicationId": 7, "applicationName": "APP"}"#).unwrap();
        assert_eq!(numeric.application_id, 7);

        let stringy: Application =
            serde_json::from_str(r#"{"applicationId": "7", "applicationName": "APP"}"#).unwrap();
        assert_eq!(stringy.application_id, 7);

        let bad = serde_json::from_str::<Application>(
            r#"{"applicationId": "seven", "applicationName": "APP"}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_response_list_defaults_to_empty() {
        let list: ResponseList<Application> = serde_json::from_str("{}").unwrap();
        assert!(list.response_list.is_empty());
    }

    #[test]
    fn test_profile_job_created_without_id() {
        let created: ProfileJobCreated =
            serde_json::from_str(r#"{"errorMessage": "ruleset busy"}"#).unwrap();
        assert!(created.profile_job_id.is_none());
    }

    #[test]
    fn test_execution_status_terminality() {
        for status in [
            ExecutionStatus::Succeeded,
            ExecutionStatus::Failed,
            ExecutionStatus::Error,
            ExecutionStatus::Cancelled,
        ] {
            assert!(status.is_terminal());
        }
        for status in [
            ExecutionStatus::Pending,
            ExecutionStatus::Running,
            ExecutionStatus::Other,
        ] {
            assert!(!status.is_terminal());
        }

        assert!(ExecutionStatus::Failed.is_failure());
        assert!(ExecutionStatus::Error.is_failure());
        assert!(!ExecutionStatus::Succeeded.is_failure());
    }

    #[test]
    fn test_unknown_status_value() {
        let state: ExecutionState = serde_json::from_str(
            r#"{"executionId": 1, "jobId": 2, "status": "QUEUED_WEIRDLY"}"#,
        )
        .unwrap();
        assert_eq!(state.status, ExecutionStatus::Other);
        assert!(!state.status.is_terminal());
    }
}
