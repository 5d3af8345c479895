//! Debugger event channel.
//!
//! An [`EventChannel`] owns a listening endpoint (a filesystem socket on unix,
//! a named pipe on Windows) that a debuggee connects back to. Each connection
//! is decoded with the [`codec`] crate and the resulting events are handed to
//! listeners registered with [`EventChannel::on_process_launched`] and
//! [`EventChannel::on_debugging_stopped`].
//!
//! The endpoint address is derived from the process id, so only one channel
//! may be bound at a time. A [`ChannelRegistry`] tracks the active channel and
//! closes the previous one whenever a new channel starts.
//!
//! A channel observes a single debuggee: once the debuggee reports that
//! debugging stopped, or disconnects, the channel notifies its listeners and
//! closes itself.

mod channel;
mod connection;
mod endpoint;
mod error;
mod events;
mod listener;
pub mod listeners;
mod registry;

pub use channel::EventChannel;
pub use endpoint::Endpoint;
pub use error::BindError;
pub use events::{DebuggingStopped, ProcessLaunched, StopCause};
pub use listeners::{Listeners, Subscription};
pub use registry::ChannelRegistry;
