use std::{fmt, path::PathBuf};

use channel::EventChannel;

use crate::protocol::{LegacyStartInfo, ProjectInformation, VsTestStartInfo};

/// Where a session currently is.
///
/// ```text
/// Idle -> SavingFiles -> RequestingStartInfo -> LegacyPath | VsTestPath
///      -> Launching -> Running -> Completed | Failed
/// ```
///
/// Running a test (rather than debugging it) goes straight from
/// `SavingFiles` to `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    SavingFiles,
    RequestingStartInfo,
    LegacyPath,
    VsTestPath,
    Launching,
    Running,
    Completed,
    Failed,
}

/// Which start-info protocol a debugging session uses.
///
/// Chosen once from the project metadata and carried through the session.
#[derive(Debug, Clone)]
pub enum ProtocolVariant {
    /// Legacy projects; no debugger events are reported.
    Legacy,
    /// MSBuild projects; the test host reports through `channel`.
    VsTest { channel: EventChannel },
}

/// Which variant a project needs, before any channel exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProtocolKind {
    Legacy,
    VsTest,
}

impl ProtocolKind {
    pub(crate) fn for_project(project: &ProjectInformation) -> Option<Self> {
        if project.dot_net_project.is_some() {
            Some(ProtocolKind::Legacy)
        } else if project.ms_build_project.is_some() {
            Some(ProtocolKind::VsTest)
        } else {
            None
        }
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolKind::Legacy => f.write_str("legacy"),
            ProtocolKind::VsTest => f.write_str("vstest"),
        }
    }
}

/// Start info returned by the upstream server, one shape per variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartInfo {
    Legacy(LegacyStartInfo),
    VsTest {
        info: VsTestStartInfo,
        /// Endpoint the debuggee reports its lifecycle events to.
        debugger_events_pipe: PathBuf,
    },
}
