//! The listening side of the debugger event protocol.

use std::{
    fmt,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio_util::sync::CancellationToken;

use crate::{
    connection,
    endpoint::Endpoint,
    error::BindError,
    events::{DebuggingStopped, ProcessLaunched, StopCause},
    listener::EndpointListener,
    listeners::{Listeners, Subscription},
    registry::ChannelRegistry,
};

/// Back-off after a failed accept so a broken listener does not spin.
const ACCEPT_ERROR_DELAY: Duration = Duration::from_millis(100);

/// Listening endpoint for debugger lifecycle events.
///
/// Cloning an `EventChannel` produces another handle to the same channel.
pub struct EventChannel {
    pub(crate) shared: Arc<Shared>,
}

pub(crate) struct Shared {
    endpoint: Endpoint,
    registry: ChannelRegistry,
    process_launched: Listeners<ProcessLaunched>,
    debugging_stopped: Listeners<DebuggingStopped>,
    started: AtomicBool,
    bound: AtomicBool,
    closed: AtomicBool,
    cancel: CancellationToken,
}

impl EventChannel {
    /// Create a channel for `endpoint`. Nothing is bound until [`start`].
    ///
    /// [`start`]: EventChannel::start
    pub fn new(endpoint: Endpoint, registry: ChannelRegistry) -> Self {
        Self {
            shared: Arc::new(Shared {
                endpoint,
                registry,
                process_launched: Listeners::new(),
                debugging_stopped: Listeners::new(),
                started: AtomicBool::new(false),
                bound: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Bind the endpoint and start accepting debuggee connections.
    ///
    /// Any channel currently registered is closed first, and a leftover
    /// endpoint file is removed before binding. Failures up to and including
    /// the bind are returned; problems accepting connections afterwards are
    /// only logged.
    #[tracing::instrument(skip(self), fields(endpoint = %self.shared.endpoint))]
    pub async fn start(&self) -> Result<(), BindError> {
        if self.is_closed() {
            return Err(BindError::Closed);
        }
        if self.shared.started.swap(true, Ordering::SeqCst) {
            return Err(BindError::AlreadyStarted);
        }

        self.shared.registry.claim(self);

        match self.bind().await {
            Ok(listener) => {
                self.shared.bound.store(true, Ordering::SeqCst);
                tracing::debug!("event channel listening");
                tokio::spawn(accept_loop(listener, Arc::clone(&self.shared)));
                Ok(())
            }
            Err(e) => {
                tracing::debug!(error = %e, "event channel failed to start");
                self.close();
                Err(e)
            }
        }
    }

    async fn bind(&self) -> Result<EndpointListener, BindError> {
        let endpoint = &self.shared.endpoint;

        endpoint
            .ensure_parent()
            .await
            .map_err(|source| BindError::CreateDirectory {
                path: endpoint
                    .path()
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default(),
                source,
            })?;

        endpoint
            .remove_stale()
            .await
            .map_err(|source| BindError::RemoveStale {
                path: endpoint.path().to_path_buf(),
                source,
            })?;

        EndpointListener::bind(endpoint).map_err(|source| BindError::Bind {
            path: endpoint.path().to_path_buf(),
            source,
        })
    }

    /// Register a callback for [`ProcessLaunched`] events.
    pub fn on_process_launched(
        &self,
        callback: impl Fn(&ProcessLaunched) + Send + Sync + 'static,
    ) -> Subscription {
        self.shared.process_launched.subscribe(callback)
    }

    /// Register a callback for [`DebuggingStopped`] events.
    ///
    /// The callback runs at most once per channel.
    pub fn on_debugging_stopped(
        &self,
        callback: impl Fn(&DebuggingStopped) + Send + Sync + 'static,
    ) -> Subscription {
        self.shared.debugging_stopped.subscribe(callback)
    }

    /// Address the debuggee should connect to while the channel is listening.
    ///
    /// `None` before the endpoint is bound and again once the channel closed,
    /// including when a newer channel replaced it.
    pub fn pipe_path(&self) -> Option<&Path> {
        if self.shared.bound.load(Ordering::SeqCst) && !self.is_closed() {
            Some(self.shared.endpoint.path())
        } else {
            None
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.shared.endpoint
    }

    pub fn is_started(&self) -> bool {
        self.shared.started.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Stop listening. Calling this more than once is a no-op.
    ///
    /// Listeners are not notified; the endpoint file, if any, is removed.
    pub fn close(&self) {
        if self.shared.begin_close() {
            tracing::debug!(endpoint = %self.shared.endpoint, "closing event channel");
            self.shared.finish_close(true);
        }
    }

    pub(crate) fn ptr_eq(&self, other: &EventChannel) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Shared {
    /// Flip the closed flag. Only the caller that wins gets `true`.
    fn begin_close(&self) -> bool {
        self.closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Tear the channel down after [`Shared::begin_close`] succeeded.
    ///
    /// `release_slot` is false when the registry itself is replacing this
    /// channel and already holds its lock.
    ///
    /// The endpoint address is shared by every channel in the process, so the
    /// file is only removed while this channel still holds the slot. Once a
    /// newer channel claimed it, the file belongs to that channel.
    pub(crate) fn finish_close(self: &Arc<Self>, release_slot: bool) {
        if release_slot {
            let released = self.registry.release_shared(self, || self.remove_endpoint());
            if !released && self.bound.load(Ordering::SeqCst) {
                tracing::debug!(endpoint = %self.endpoint, "endpoint owned by a newer channel, leaving it in place");
            }
        } else {
            // called from within the registry's critical section, before the
            // new holder binds
            self.remove_endpoint();
        }
        self.cancel.cancel();
        self.process_launched.clear();
        self.debugging_stopped.clear();
    }

    fn remove_endpoint(&self) {
        if self.bound.load(Ordering::SeqCst) {
            self.endpoint.remove();
        }
    }

    /// Close on behalf of the registry, which has already cleared the slot.
    pub(crate) fn close_replaced(self: &Arc<Self>) {
        if self.begin_close() {
            tracing::debug!(endpoint = %self.endpoint, "closing event channel replaced by a newer one");
            self.finish_close(false);
        }
    }

    pub(crate) fn process_launched(&self, target_process_id: i32) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        tracing::debug!(target_process_id, "debuggee launched process");
        self.process_launched
            .emit(&ProcessLaunched { target_process_id });
    }

    /// Notify listeners once, then close.
    pub(crate) fn debugging_stopped(self: &Arc<Self>, cause: StopCause) {
        if !self.begin_close() {
            return;
        }
        tracing::debug!(?cause, "debugging stopped");
        self.debugging_stopped.emit(&DebuggingStopped { cause });
        self.finish_close(true);
    }
}

async fn accept_loop(mut listener: EndpointListener, shared: Arc<Shared>) {
    let cancel = shared.cancel.clone();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("listener cancelled");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok(stream) => {
                    tracing::debug!("debuggee connected");
                    tokio::spawn(connection::serve(
                        stream,
                        Arc::clone(&shared),
                        cancel.child_token(),
                    ));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "serious error on the test debugger events endpoint");
                    tokio::time::sleep(ACCEPT_ERROR_DELAY).await;
                }
            }
        }
    }
}

impl Clone for EventChannel {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("endpoint", &self.shared.endpoint)
            .field("started", &self.is_started())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::BytesMut;
    use codec::DebuggerEventCodec;

    use super::*;

    fn channel() -> EventChannel {
        EventChannel::new(Endpoint::new("/nonexistent", 1), ChannelRegistry::new())
    }

    fn record(channel: &EventChannel) -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let launched = Arc::clone(&seen);
        channel
            .on_process_launched(move |e| {
                launched
                    .lock()
                    .unwrap()
                    .push(format!("launched {}", e.target_process_id))
            })
            .detach();
        let stopped = Arc::clone(&seen);
        channel
            .on_debugging_stopped(move |e| stopped.lock().unwrap().push(format!("{:?}", e.cause)))
            .detach();
        seen
    }

    fn frame(event: codec::DebuggerEvent) -> Vec<u8> {
        codec::encode(event).to_vec()
    }

    #[test]
    fn close_is_idempotent_and_silent() {
        let channel = channel();
        let seen = record(&channel);

        channel.close();
        channel.close();

        assert!(channel.is_closed());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn stop_notifies_once_and_closes() {
        let channel = channel();
        let seen = record(&channel);

        channel.shared.debugging_stopped(StopCause::Reported);
        channel.shared.debugging_stopped(StopCause::Disconnected);

        assert!(channel.is_closed());
        assert_eq!(*seen.lock().unwrap(), vec!["Reported"]);
    }

    #[test]
    fn events_after_close_are_ignored() {
        let channel = channel();
        let seen = record(&channel);

        channel.close();
        channel.shared.process_launched(12);
        channel.shared.debugging_stopped(StopCause::Reported);

        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn pipe_path_unavailable_before_start() {
        let channel = channel();
        assert!(channel.pipe_path().is_none());
        assert!(!channel.is_started());
    }

    #[test]
    fn pipe_path_unavailable_after_close() {
        let channel = channel();
        channel.shared.bound.store(true, Ordering::SeqCst);
        assert!(channel.pipe_path().is_some());

        channel.close();
        assert!(channel.pipe_path().is_none());
    }

    #[test]
    fn drain_dispatches_complete_frames_in_order() {
        let channel = channel();
        let seen = record(&channel);
        let mut codec = DebuggerEventCodec::new();

        let mut bytes = frame(codec::DebuggerEvent::ProcessLaunched {
            target_process_id: 7,
        });
        let stopped = frame(codec::DebuggerEvent::DebuggingStopped);
        bytes.extend_from_slice(&stopped[..2]);

        let mut buffer = BytesMut::from(&bytes[..]);
        connection::drain(&mut codec, &mut buffer, &channel.shared);
        assert_eq!(*seen.lock().unwrap(), vec!["launched 7"]);
        assert_eq!(buffer.len(), 2);

        buffer.extend_from_slice(&stopped[2..]);
        connection::drain(&mut codec, &mut buffer, &channel.shared);
        assert_eq!(*seen.lock().unwrap(), vec!["launched 7", "Reported"]);
        assert!(channel.is_closed());
    }

    #[test]
    fn drain_drops_malformed_chunk_and_keeps_going() {
        let channel = channel();
        let seen = record(&channel);
        let mut codec = DebuggerEventCodec::new();

        let mut buffer = BytesMut::from(&[42u8, 0, 0, 0, 1, 2, 3][..]);
        connection::drain(&mut codec, &mut buffer, &channel.shared);
        assert!(buffer.is_empty());
        assert!(seen.lock().unwrap().is_empty());
        assert!(!channel.is_closed());

        buffer.extend_from_slice(&frame(codec::DebuggerEvent::ProcessLaunched {
            target_process_id: 8,
        }));
        connection::drain(&mut codec, &mut buffer, &channel.shared);
        assert_eq!(*seen.lock().unwrap(), vec!["launched 8"]);
    }

    #[tokio::test]
    async fn disconnect_after_stop_notifies_once() {
        let channel = channel();
        let seen = record(&channel);

        let (mut client, server) = tokio::io::duplex(64);
        let task = tokio::spawn(connection::serve(
            server,
            Arc::clone(&channel.shared),
            CancellationToken::new(),
        ));

        use tokio::io::AsyncWriteExt;
        client
            .write_all(&frame(codec::DebuggerEvent::DebuggingStopped))
            .await
            .unwrap();
        drop(client);
        task.await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["Reported"]);
        assert!(channel.is_closed());
    }

    #[tokio::test]
    async fn disconnect_implies_stop() {
        let channel = channel();
        let seen = record(&channel);

        let (mut client, server) = tokio::io::duplex(64);
        let task = tokio::spawn(connection::serve(
            server,
            Arc::clone(&channel.shared),
            CancellationToken::new(),
        ));

        use tokio::io::AsyncWriteExt;
        client
            .write_all(&frame(codec::DebuggerEvent::ProcessLaunched {
                target_process_id: 4242,
            }))
            .await
            .unwrap();
        drop(client);
        task.await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["launched 4242", "Disconnected"]);
        assert!(channel.is_closed());
    }
}
