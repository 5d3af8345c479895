//! Relays debugger lifecycle events from an [`EventChannel`] to the upstream
//! server for the vstest protocol.
use std::sync::Arc;

use channel::{EventChannel, StopCause};
use tokio::sync::{mpsc, watch};

use crate::collaborators::{OutputSurface, UpstreamServer};
use crate::coordinator::forward_test_messages;
use crate::protocol::{DebugTestLaunchRequest, DebugTestStopRequest};
use crate::state::SessionState;

#[derive(Debug)]
enum Notification {
    Launched(i32),
    Stopped(StopCause),
}

/// Start relaying events from `channel`.
///
/// Must be called before the channel is started so no event is missed. The
/// task ends after the first stop notification, or when the channel closes
/// and drops its listeners.
pub(crate) fn spawn<U: UpstreamServer>(
    channel: &EventChannel,
    upstream: Arc<U>,
    output: Arc<dyn OutputSurface>,
    state: Arc<watch::Sender<SessionState>>,
    file_name: String,
) {
    let (tx, rx) = mpsc::unbounded_channel();

    let launched_tx = tx.clone();
    channel
        .on_process_launched(move |event| {
            let _ = launched_tx.send(Notification::Launched(event.target_process_id));
        })
        .detach();
    channel
        .on_debugging_stopped(move |event| {
            let _ = tx.send(Notification::Stopped(event.cause));
        })
        .detach();

    tokio::spawn(run(rx, upstream, output, state, file_name));
}

#[tracing::instrument(skip(rx, upstream, output, state))]
async fn run<U: UpstreamServer>(
    mut rx: mpsc::UnboundedReceiver<Notification>,
    upstream: Arc<U>,
    output: Arc<dyn OutputSurface>,
    state: Arc<watch::Sender<SessionState>>,
    file_name: String,
) {
    while let Some(notification) = rx.recv().await {
        tracing::debug!(?notification, "debugger event");
        match notification {
            Notification::Launched(target_process_id) => {
                output.append_line(&format!("Started debugging process #{target_process_id}."));

                let _messages = forward_test_messages(upstream.as_ref(), &output);
                let request = DebugTestLaunchRequest {
                    file_name: file_name.clone(),
                    target_process_id,
                };
                if let Err(report) = upstream.debug_test_launch(request).await {
                    tracing::warn!(error = %format!("{report:#}"), "debug test launch request failed");
                    output.append_line(&format!(
                        "Warning: could not continue test process #{target_process_id}: {report:#}"
                    ));
                }
            }
            Notification::Stopped(cause) => {
                output.append_line("Debugging complete.");

                let request = DebugTestStopRequest {
                    file_name: file_name.clone(),
                };
                if let Err(report) = upstream.debug_test_stop(request).await {
                    tracing::warn!(error = %format!("{report:#}"), ?cause, "debug test stop request failed");
                }

                state.send_if_modified(|current| {
                    if matches!(current, SessionState::Launching | SessionState::Running) {
                        tracing::debug!(previous = ?current, "session complete");
                        *current = SessionState::Completed;
                        true
                    } else {
                        false
                    }
                });
                break;
            }
        }
    }
    tracing::debug!("debugger event monitor finished");
}
