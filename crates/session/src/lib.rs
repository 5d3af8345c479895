//! Test session coordination
//!
//! [`TestCoordinator`] drives a single test run or test debugging session
//! against an upstream analysis server. Debugging MSBuild projects goes
//! through the `vstest` protocol, which needs a [`channel::EventChannel`] so
//! the test host can report when it launched the process to attach to and
//! when debugging finished.
mod collaborators;
mod coordinator;
mod error;
mod launch;
mod monitor;
pub mod protocol;
mod state;

pub use collaborators::{DebugFrontend, OutputSurface, UpstreamServer, Workspace};
pub use coordinator::{TestCoordinator, TestSummary};
pub use error::SessionError;
pub use launch::{DEBUGGER_TYPE, LAUNCH_NAME, LAUNCH_REQUEST, TestLaunchConfiguration};
pub use state::{ProtocolVariant, SessionState, StartInfo};
