#![allow(dead_code)]

use std::{
    io::IsTerminal,
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use channel::{Listeners, Subscription};
use config::DebugOptions;
use eyre::WrapErr;
use session::{
    DebugFrontend, OutputSurface, TestLaunchConfiguration, UpstreamServer, Workspace,
    protocol::{
        DebugTestLaunchRequest, DebugTestStopRequest, LegacyStartInfo, ProjectInformation,
        ProjectInformationRequest, RunTestResponse, TestMessageEvent, TestMethodRequest,
        VsTestStartInfo,
    },
};
use tracing_subscriber::EnvFilter;

pub fn init_test_logging() {
    let in_ci = std::env::var("CI")
        .map(|val| val == "true")
        .unwrap_or(false);

    if std::io::stderr().is_terminal() || in_ci {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .json()
            .try_init();
    }

    // error traces
    let _ = color_eyre::install();
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    RunTest(TestMethodRequest),
    ProjectInformation(ProjectInformationRequest),
    LegacyStartInfo(TestMethodRequest),
    VsTestStartInfo(TestMethodRequest),
    DebugTestLaunch(DebugTestLaunchRequest),
    DebugTestStop(DebugTestStopRequest),
}

/// Upstream server returning canned responses and recording every request.
pub struct StubUpstream {
    pub run_response: Result<RunTestResponse, String>,
    pub project: ProjectInformation,
    pub legacy: LegacyStartInfo,
    pub vstest: VsTestStartInfo,
    /// Pushed to test message listeners while a request is in flight.
    pub progress: Option<String>,
    pub messages: Listeners<TestMessageEvent>,
    /// Fail the vstest start info request.
    pub fail_vstest_start_info: bool,
    /// Runs while a start info request is in flight.
    pub during_start_info: Option<Box<dyn Fn() + Send + Sync>>,
    pub calls: Mutex<Vec<Call>>,
}

impl Default for StubUpstream {
    fn default() -> Self {
        Self {
            run_response: Ok(RunTestResponse::default()),
            project: ProjectInformation::default(),
            legacy: LegacyStartInfo {
                executable: "dnx".to_string(),
                argument: "test -wait".to_string(),
                working_directory: "/src/Calc".to_string(),
            },
            vstest: VsTestStartInfo {
                file_name: "dotnet".to_string(),
                arguments: "vstest Calc.dll".to_string(),
                working_directory: "/src/Calc".to_string(),
            },
            progress: None,
            messages: Listeners::new(),
            fail_vstest_start_info: false,
            during_start_info: None,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl StubUpstream {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
        if let Some(message) = &self.progress {
            self.messages.emit(&TestMessageEvent {
                message_level: "info".to_string(),
                message: message.clone(),
            });
        }
    }
}

impl UpstreamServer for StubUpstream {
    async fn run_test(&self, request: TestMethodRequest) -> eyre::Result<RunTestResponse> {
        self.record(Call::RunTest(request));
        match &self.run_response {
            Ok(response) => Ok(response.clone()),
            Err(reason) => Err(eyre::eyre!("{reason}")),
        }
    }

    async fn project_information(
        &self,
        request: ProjectInformationRequest,
    ) -> eyre::Result<ProjectInformation> {
        self.record(Call::ProjectInformation(request));
        Ok(self.project.clone())
    }

    async fn legacy_start_info(&self, request: TestMethodRequest) -> eyre::Result<LegacyStartInfo> {
        self.record(Call::LegacyStartInfo(request));
        if let Some(hook) = &self.during_start_info {
            hook();
        }
        Ok(self.legacy.clone())
    }

    async fn vstest_start_info(&self, request: TestMethodRequest) -> eyre::Result<VsTestStartInfo> {
        self.record(Call::VsTestStartInfo(request));
        if let Some(hook) = &self.during_start_info {
            hook();
        }
        if self.fail_vstest_start_info {
            return Err(eyre::eyre!("no test adapter found"));
        }
        Ok(self.vstest.clone())
    }

    async fn debug_test_launch(&self, request: DebugTestLaunchRequest) -> eyre::Result<()> {
        self.record(Call::DebugTestLaunch(request));
        Ok(())
    }

    async fn debug_test_stop(&self, request: DebugTestStopRequest) -> eyre::Result<()> {
        self.record(Call::DebugTestStop(request));
        Ok(())
    }

    fn on_test_message(
        &self,
        listener: impl Fn(&TestMessageEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.messages.subscribe(listener)
    }
}

#[derive(Clone, Default)]
pub struct StubWorkspace {
    pub options: DebugOptions,
    pub fail_save: bool,
    pub saves: Arc<AtomicUsize>,
}

impl StubWorkspace {
    pub fn with_options(options: serde_json::Value) -> Self {
        let options = options.as_object().cloned().unwrap_or_default();
        Self {
            options: DebugOptions::from(options),
            ..Default::default()
        }
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl Workspace for StubWorkspace {
    async fn save_all(&self) -> eyre::Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_save {
            return Err(eyre::eyre!("disk full")).wrap_err("saving Calc.cs");
        }
        Ok(())
    }

    fn debug_options(&self) -> DebugOptions {
        self.options.clone()
    }
}

/// What the stub front-end does with an accepted configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Debuggee {
    /// Accept the configuration and do nothing else.
    #[default]
    Idle,
    /// Connect to the debugger events endpoint, report `ProcessLaunched`
    /// and disconnect.
    LaunchThenDisconnect(i32),
    /// Reject the configuration.
    Fail,
}

#[derive(Clone, Default)]
pub struct StubFrontend {
    pub debuggee: Debuggee,
    pub launched: Arc<Mutex<Vec<TestLaunchConfiguration>>>,
}

impl StubFrontend {
    pub fn new(debuggee: Debuggee) -> Self {
        Self {
            debuggee,
            ..Default::default()
        }
    }

    pub fn launched(&self) -> Vec<TestLaunchConfiguration> {
        self.launched.lock().unwrap().clone()
    }
}

impl DebugFrontend for StubFrontend {
    async fn start_debugging(&self, configuration: TestLaunchConfiguration) -> eyre::Result<()> {
        let pipe = configuration.debugger_events_pipe_name.clone();
        self.launched.lock().unwrap().push(configuration);

        match self.debuggee {
            Debuggee::Idle => Ok(()),
            Debuggee::Fail => Err(eyre::eyre!("no debug adapter for coreclr")),
            Debuggee::LaunchThenDisconnect(target_process_id) => {
                let pipe = pipe.ok_or_else(|| eyre::eyre!("no debugger events pipe"))?;
                tokio::spawn(run_debuggee(pipe, target_process_id));
                Ok(())
            }
        }
    }
}

#[cfg(unix)]
async fn run_debuggee(pipe: PathBuf, target_process_id: i32) {
    use codec::DebuggerEvent;
    use tokio::{io::AsyncWriteExt, net::UnixStream};

    let mut stream = UnixStream::connect(&pipe).await.unwrap();
    let frame = codec::encode(DebuggerEvent::ProcessLaunched { target_process_id });
    stream.write_all(&frame).await.unwrap();
    stream.shutdown().await.unwrap();
}

#[cfg(not(unix))]
async fn run_debuggee(_pipe: PathBuf, _target_process_id: i32) {
    unimplemented!("stub debuggee only speaks unix sockets")
}

#[derive(Default)]
pub struct RecordingOutput {
    pub reveals: AtomicUsize,
    lines: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl RecordingOutput {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn contains_line(&self, line: &str) -> bool {
        self.lines().iter().any(|l| l == line)
    }

    pub fn count_lines(&self, line: &str) -> usize {
        self.lines().iter().filter(|l| *l == line).count()
    }
}

impl OutputSurface for RecordingOutput {
    fn reveal(&self) {
        self.reveals.fetch_add(1, Ordering::SeqCst);
    }

    fn append_line(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }

    fn show_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}
