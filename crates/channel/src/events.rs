//! Events delivered to channel listeners.

/// The debuggee launched the process under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessLaunched {
    pub target_process_id: i32,
}

/// The debuggee is done, either because it said so or because it went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebuggingStopped {
    pub cause: StopCause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    /// A `DebuggingStopped` frame was received.
    Reported,
    /// The connection ended without one.
    Disconnected,
}
