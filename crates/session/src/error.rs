use channel::BindError;

/// Why a test session failed.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Unsaved editor buffers could not be written.
    #[error("saving unsaved files failed: {reason}")]
    SaveFailed { reason: String },

    /// The project is neither a legacy project nor an MSBuild project.
    #[error("unsupported project kind: expected a legacy or MSBuild project")]
    UnsupportedProjectKind,

    /// The upstream server failed a request.
    #[error("{request} request failed: {reason}")]
    UpstreamRequestFailed {
        request: &'static str,
        reason: String,
    },

    /// The debugger event channel could not be started.
    #[error("starting debugger event channel: {0}")]
    Bind(#[from] BindError),

    /// The event channel was closed before the debuggee could be launched.
    #[error("debugger event channel closed before launch")]
    ChannelClosed,

    /// The debugging front-end could not start the session.
    #[error("launching debugger failed: {reason}")]
    LaunchFailed { reason: String },
}

impl SessionError {
    pub(crate) fn upstream(request: &'static str) -> impl FnOnce(eyre::Report) -> Self {
        move |report| SessionError::UpstreamRequestFailed {
            request,
            reason: format!("{report:#}"),
        }
    }
}
