//! Requests and responses exchanged with the upstream server.
//!
//! Field names follow the server's PascalCase JSON.
use serde::{Deserialize, Deserializer, Serialize};

/// Identifies a single test method.
///
/// Used for running a test and for both start-info requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestMethodRequest {
    pub file_name: String,
    pub method_name: String,
    pub test_framework_name: String,
}

impl TestMethodRequest {
    pub fn new(
        file_name: impl Into<String>,
        method_name: impl Into<String>,
        test_framework_name: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            method_name: method_name.into(),
            test_framework_name: test_framework_name.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RunTestResponse {
    #[serde(default)]
    pub results: Vec<TestResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestResult {
    pub method_name: String,
    pub outcome: TestOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_stack_trace: Option<String>,
}

/// Outcome tag of a single test result.
///
/// Tags are matched case-insensitively; anything unrecognised (`none`,
/// `notfound`, ...) becomes [`TestOutcome::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    Passed,
    Failed,
    Skipped,
    Other,
}

impl<'de> Deserialize<'de> for TestOutcome {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        let outcome = match tag.to_ascii_lowercase().as_str() {
            "passed" => TestOutcome::Passed,
            "failed" => TestOutcome::Failed,
            "skipped" => TestOutcome::Skipped,
            other => {
                tracing::debug!(outcome = other, "unrecognised test outcome");
                TestOutcome::Other
            }
        };
        Ok(outcome)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProjectInformationRequest {
    pub file_name: String,
}

/// Project metadata; at most one of the markers is expected to be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectInformation {
    #[serde(rename = "DotNetProject", default)]
    pub dot_net_project: Option<serde_json::Value>,
    #[serde(rename = "MsBuildProject", default)]
    pub ms_build_project: Option<serde_json::Value>,
}

/// Start info for the legacy protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LegacyStartInfo {
    pub executable: String,
    pub argument: String,
    pub working_directory: String,
}

/// Start info for the vstest protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VsTestStartInfo {
    pub file_name: String,
    pub arguments: String,
    pub working_directory: String,
}

/// Ask the server to let the test host continue once the debugger attached
/// to `target_process_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DebugTestLaunchRequest {
    pub file_name: String,
    pub target_process_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DebugTestStopRequest {
    pub file_name: String,
}

/// Progress message pushed by the server while a test request is running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestMessageEvent {
    #[serde(default)]
    pub message_level: String,
    pub message: String,
}
