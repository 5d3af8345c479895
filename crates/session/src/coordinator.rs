use std::{fmt, path::PathBuf, sync::Arc};

use channel::{ChannelRegistry, Endpoint, EventChannel, Subscription};
use config::{DebugOptions, Settings};
use tokio::sync::watch;

use crate::{
    collaborators::{DebugFrontend, OutputSurface, UpstreamServer, Workspace},
    error::SessionError,
    launch::TestLaunchConfiguration,
    monitor,
    protocol::{ProjectInformationRequest, TestMethodRequest, TestOutcome, TestResult},
    state::{ProtocolKind, ProtocolVariant, SessionState, StartInfo},
};

/// Outcome counts of a test run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl TestSummary {
    pub fn from_results(results: &[TestResult]) -> Self {
        results.iter().fold(
            TestSummary {
                total: results.len(),
                ..Default::default()
            },
            |mut summary, result| {
                match result.outcome {
                    TestOutcome::Passed => summary.passed += 1,
                    TestOutcome::Failed => summary.failed += 1,
                    TestOutcome::Skipped => summary.skipped += 1,
                    TestOutcome::Other => {}
                }
                summary
            },
        )
    }
}

impl fmt::Display for TestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total tests: {}. Passed: {}. Failed: {}. Skipped: {}.",
            self.total, self.passed, self.failed, self.skipped
        )
    }
}

/// Forward upstream test messages to `output` until the returned handle is
/// dropped.
pub(crate) fn forward_test_messages<U: UpstreamServer>(
    upstream: &U,
    output: &Arc<dyn OutputSurface>,
) -> Subscription {
    let output = Arc::clone(output);
    upstream.on_test_message(move |event| output.append_line(&event.message))
}

/// Runs and debugs single test methods.
///
/// One coordinator narrates one session at a time; callers must not start a
/// second session before the previous call returned.
pub struct TestCoordinator<U, W, D> {
    upstream: Arc<U>,
    workspace: W,
    frontend: D,
    output: Arc<dyn OutputSurface>,
    registry: ChannelRegistry,
    events_directory: PathBuf,
    /// Options from the settings file, below the workspace's own options.
    settings_options: DebugOptions,
    state: Arc<watch::Sender<SessionState>>,
}

impl<U, W, D> TestCoordinator<U, W, D>
where
    U: UpstreamServer,
    W: Workspace,
    D: DebugFrontend,
{
    pub fn new(
        upstream: Arc<U>,
        workspace: W,
        frontend: D,
        output: Arc<dyn OutputSurface>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            upstream,
            workspace,
            frontend,
            output,
            registry: ChannelRegistry::process_wide(),
            events_directory: config::default_events_directory(),
            settings_options: DebugOptions::default(),
            state: Arc::new(state),
        }
    }

    /// Use `registry` instead of the process-wide one.
    pub fn with_registry(mut self, registry: ChannelRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Where debugger event endpoints are created.
    pub fn with_events_directory(mut self, events_directory: impl Into<PathBuf>) -> Self {
        self.events_directory = events_directory.into();
        self
    }

    /// Apply user settings.
    ///
    /// The configured events directory replaces the current one. The
    /// configured debug options become the base layer of every launch
    /// configuration; options from the workspace override them key by key.
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.events_directory = settings.events_directory();
        self.settings_options = settings.debug_options().clone();
        self
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Run a single test method and report the outcome counts.
    #[tracing::instrument(skip(self))]
    pub async fn run_test(
        &self,
        test_method: &str,
        file_name: &str,
        test_framework_name: &str,
    ) -> Result<TestSummary, SessionError> {
        self.output.reveal();
        self.output
            .append_line(&format!("Running test {test_method}..."));

        let _messages = forward_test_messages(self.upstream.as_ref(), &self.output);
        let request = TestMethodRequest::new(file_name, test_method, test_framework_name);

        match self.drive_run(request).await {
            Ok(summary) => {
                self.transition(SessionState::Completed);
                Ok(summary)
            }
            Err(e) => {
                tracing::warn!(error = %e, "test run failed");
                self.output
                    .show_error(&format!("Failed to run test because {e}."));
                self.transition(SessionState::Failed);
                Err(e)
            }
        }
    }

    async fn drive_run(&self, request: TestMethodRequest) -> Result<TestSummary, SessionError> {
        self.save_all().await?;

        self.transition(SessionState::Running);
        let response = self
            .upstream
            .run_test(request)
            .await
            .map_err(SessionError::upstream("run test"))?;

        for result in &response.results {
            if result.outcome != TestOutcome::Failed {
                continue;
            }
            if let Some(message) = &result.error_message {
                self.output
                    .append_line(&format!("{} failed: {message}", result.method_name));
            }
        }

        let summary = TestSummary::from_results(&response.results);
        self.output.append_line(&summary.to_string());
        Ok(summary)
    }

    /// Start a debugging session for a single test method.
    ///
    /// Returns once the debugging front-end accepted the launch
    /// configuration. For MSBuild projects the debuggee lifecycle is followed
    /// in the background and the session moves to
    /// [`SessionState::Completed`] when debugging stops.
    #[tracing::instrument(skip(self))]
    pub async fn debug_test(
        &self,
        test_method: &str,
        file_name: &str,
        test_framework_name: &str,
    ) -> Result<(), SessionError> {
        self.output.reveal();
        self.output
            .append_line(&format!("Debugging method '{test_method}'."));

        let request = TestMethodRequest::new(file_name, test_method, test_framework_name);
        let mut channel = None;

        match self.drive_debug(request, &mut channel).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(error = %e, "debug session failed");
                self.output
                    .show_error(&format!("Failed to start debugger: {e}"));
                if let Some(channel) = channel {
                    channel.close();
                }
                self.transition(SessionState::Failed);
                Err(e)
            }
        }
    }

    async fn drive_debug(
        &self,
        request: TestMethodRequest,
        channel: &mut Option<EventChannel>,
    ) -> Result<(), SessionError> {
        self.save_all().await?;

        self.transition(SessionState::RequestingStartInfo);
        let project = self
            .upstream
            .project_information(ProjectInformationRequest {
                file_name: request.file_name.clone(),
            })
            .await
            .map_err(SessionError::upstream("project information"))?;

        let kind = ProtocolKind::for_project(&project).ok_or(SessionError::UnsupportedProjectKind)?;
        tracing::debug!(protocol = %kind, "selected start info protocol");

        let variant = match kind {
            ProtocolKind::Legacy => {
                self.transition(SessionState::LegacyPath);
                ProtocolVariant::Legacy
            }
            ProtocolKind::VsTest => {
                self.transition(SessionState::VsTestPath);
                let events = EventChannel::new(
                    Endpoint::for_current_process(&self.events_directory),
                    self.registry.clone(),
                );
                *channel = Some(events.clone());

                monitor::spawn(
                    &events,
                    Arc::clone(&self.upstream),
                    Arc::clone(&self.output),
                    Arc::clone(&self.state),
                    request.file_name.clone(),
                );
                events.start().await?;
                ProtocolVariant::VsTest { channel: events }
            }
        };

        let start_info = self.start_info(&variant, request).await?;

        self.transition(SessionState::Launching);
        let configuration =
            TestLaunchConfiguration::from_start_info(start_info, self.debug_options());
        self.frontend
            .start_debugging(configuration)
            .await
            .map_err(|report| SessionError::LaunchFailed {
                reason: format!("{report:#}"),
            })?;

        // the monitor may already have seen the debuggee finish
        self.state.send_if_modified(|current| {
            if *current == SessionState::Launching {
                *current = SessionState::Running;
                true
            } else {
                false
            }
        });
        Ok(())
    }

    async fn start_info(
        &self,
        variant: &ProtocolVariant,
        request: TestMethodRequest,
    ) -> Result<StartInfo, SessionError> {
        let _messages = forward_test_messages(self.upstream.as_ref(), &self.output);

        match variant {
            ProtocolVariant::Legacy => {
                let info = self
                    .upstream
                    .legacy_start_info(request)
                    .await
                    .map_err(SessionError::upstream("legacy start info"))?;
                Ok(StartInfo::Legacy(info))
            }
            ProtocolVariant::VsTest { channel } => {
                let info = self
                    .upstream
                    .vstest_start_info(request)
                    .await
                    .map_err(SessionError::upstream("vstest start info"))?;
                let debugger_events_pipe = channel
                    .pipe_path()
                    .ok_or(SessionError::ChannelClosed)?
                    .to_path_buf();
                Ok(StartInfo::VsTest {
                    info,
                    debugger_events_pipe,
                })
            }
        }
    }

    fn debug_options(&self) -> DebugOptions {
        let workspace = self.workspace.debug_options();
        if self.settings_options.is_empty() {
            return workspace;
        }
        DebugOptions::from(
            self.settings_options
                .merged_with(workspace.as_map().clone()),
        )
    }

    async fn save_all(&self) -> Result<(), SessionError> {
        self.transition(SessionState::SavingFiles);
        self.workspace
            .save_all()
            .await
            .map_err(|report| SessionError::SaveFailed {
                reason: format!("{report:#}"),
            })
    }

    fn transition(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        tracing::debug!(?previous, ?next, "session state transition");
    }
}

impl<U, W, D> fmt::Debug for TestCoordinator<U, W, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCoordinator")
            .field("registry", &self.registry)
            .field("events_directory", &self.events_directory)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}
