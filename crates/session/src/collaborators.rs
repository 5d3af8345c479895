//! Interfaces of the components a test session talks to.
//!
//! The coordinator never implements any of these itself; the editor
//! integration provides them.
use std::future::Future;

use channel::Subscription;
use config::DebugOptions;

use crate::launch::TestLaunchConfiguration;
use crate::protocol::{
    DebugTestLaunchRequest, DebugTestStopRequest, LegacyStartInfo, ProjectInformation,
    ProjectInformationRequest, RunTestResponse, TestMessageEvent, TestMethodRequest,
    VsTestStartInfo,
};

/// The language analysis server that knows how to run and debug tests.
pub trait UpstreamServer: Send + Sync + 'static {
    fn run_test(
        &self,
        request: TestMethodRequest,
    ) -> impl Future<Output = eyre::Result<RunTestResponse>> + Send;

    fn project_information(
        &self,
        request: ProjectInformationRequest,
    ) -> impl Future<Output = eyre::Result<ProjectInformation>> + Send;

    /// Start info for the legacy protocol.
    fn legacy_start_info(
        &self,
        request: TestMethodRequest,
    ) -> impl Future<Output = eyre::Result<LegacyStartInfo>> + Send;

    /// Start info for the vstest protocol.
    fn vstest_start_info(
        &self,
        request: TestMethodRequest,
    ) -> impl Future<Output = eyre::Result<VsTestStartInfo>> + Send;

    fn debug_test_launch(
        &self,
        request: DebugTestLaunchRequest,
    ) -> impl Future<Output = eyre::Result<()>> + Send;

    fn debug_test_stop(
        &self,
        request: DebugTestStopRequest,
    ) -> impl Future<Output = eyre::Result<()>> + Send;

    /// Subscribe to test messages pushed while a request is in flight.
    fn on_test_message(
        &self,
        listener: impl Fn(&TestMessageEvent) + Send + Sync + 'static,
    ) -> Subscription;
}

/// Editor workspace operations.
pub trait Workspace: Send + Sync {
    /// Write every unsaved buffer to disk.
    fn save_all(&self) -> impl Future<Output = eyre::Result<()>> + Send;

    /// Debug options configured by the user.
    fn debug_options(&self) -> DebugOptions;
}

/// Starts debugging sessions from a launch configuration.
pub trait DebugFrontend: Send + Sync {
    fn start_debugging(
        &self,
        configuration: TestLaunchConfiguration,
    ) -> impl Future<Output = eyre::Result<()>> + Send;
}

/// User visible output.
pub trait OutputSurface: Send + Sync {
    /// Bring the output into view.
    fn reveal(&self);

    fn append_line(&self, line: &str);

    /// Show an error notification.
    fn show_error(&self, message: &str);
}
