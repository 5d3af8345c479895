use std::path::PathBuf;

use config::DebugOptions;
use serde_json::{Map, Value, json};

use crate::state::StartInfo;

/// Display name of every test debugging session.
pub const LAUNCH_NAME: &str = ".NET Test Launch";
/// Session kind marker understood by the debugging front-end.
pub const DEBUGGER_TYPE: &str = "coreclr";
pub const LAUNCH_REQUEST: &str = "launch";

const PIPE_NAME_KEY: &str = "debuggerEventsPipeName";

/// Launch configuration handed to the debugging front-end.
#[derive(Debug, Clone, PartialEq)]
pub struct TestLaunchConfiguration {
    pub name: String,
    pub kind: String,
    pub request: String,
    /// Only set for the vstest variant.
    pub debugger_events_pipe_name: Option<PathBuf>,
    pub program: String,
    pub args: String,
    pub cwd: String,
    /// User defaults the session fields are layered on top of.
    pub defaults: DebugOptions,
}

impl TestLaunchConfiguration {
    pub fn from_start_info(start_info: StartInfo, defaults: DebugOptions) -> Self {
        let (program, args, cwd, debugger_events_pipe_name) = match start_info {
            StartInfo::Legacy(info) => (
                info.executable,
                info.argument,
                info.working_directory,
                None,
            ),
            StartInfo::VsTest {
                info,
                debugger_events_pipe,
            } => (
                info.file_name,
                info.arguments,
                info.working_directory,
                Some(debugger_events_pipe),
            ),
        };

        Self {
            name: LAUNCH_NAME.to_string(),
            kind: DEBUGGER_TYPE.to_string(),
            request: LAUNCH_REQUEST.to_string(),
            debugger_events_pipe_name,
            program,
            args,
            cwd,
            defaults,
        }
    }

    /// The configuration object in the front-end's JSON shape.
    ///
    /// Session fields win over user defaults with the same key.
    pub fn to_json(&self) -> Map<String, Value> {
        let mut fields = vec![
            ("name".to_string(), json!(self.name)),
            ("type".to_string(), json!(self.kind)),
            ("request".to_string(), json!(self.request)),
            ("program".to_string(), json!(self.program)),
            ("args".to_string(), json!(self.args)),
            ("cwd".to_string(), json!(self.cwd)),
        ];
        if let Some(pipe) = &self.debugger_events_pipe_name {
            fields.push((
                PIPE_NAME_KEY.to_string(),
                json!(pipe.to_string_lossy()),
            ));
        }

        let mut config = self.defaults.merged_with(fields);
        if self.debugger_events_pipe_name.is_none() {
            config.remove(PIPE_NAME_KEY);
        }
        config
    }
}
