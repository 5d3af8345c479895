//! Per-connection frame reassembly.

use std::sync::Arc;

use bytes::BytesMut;
use codec::{DebuggerEvent, DebuggerEventCodec};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::codec::Decoder;
use tokio_util::sync::CancellationToken;

use crate::{channel::Shared, events::StopCause};

const INITIAL_BUFFER: usize = 64;

/// Read frames from one debuggee connection until it ends or the channel
/// closes.
pub(crate) async fn serve<R>(mut stream: R, shared: Arc<Shared>, cancel: CancellationToken)
where
    R: AsyncRead + Unpin,
{
    let mut codec = DebuggerEventCodec::new();
    let mut buffer = BytesMut::with_capacity(INITIAL_BUFFER);

    loop {
        let read = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("connection cancelled");
                return;
            }
            read = stream.read_buf(&mut buffer) => read,
        };

        match read {
            Ok(0) => {
                tracing::debug!("debuggee disconnected");
                shared.debugging_stopped(StopCause::Disconnected);
                return;
            }
            Ok(n) => {
                tracing::trace!(bytes = n, buffered = buffer.len(), "received data");
                drain(&mut codec, &mut buffer, &shared);
            }
            Err(e) => {
                tracing::warn!(error = %e, "reading from debuggee connection");
                shared.debugging_stopped(StopCause::Disconnected);
                return;
            }
        }
    }
}

/// Dispatch every complete frame in `buffer`.
///
/// A malformed frame discards everything buffered so far; the connection
/// stays open.
pub(crate) fn drain(
    codec: &mut DebuggerEventCodec,
    buffer: &mut BytesMut,
    shared: &Arc<Shared>,
) {
    loop {
        match codec.decode(buffer) {
            Ok(Some(event)) => dispatch(event, shared),
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, dropped = buffer.len(), "invalid event received from debugger");
                buffer.clear();
                break;
            }
        }
    }
}

fn dispatch(event: DebuggerEvent, shared: &Arc<Shared>) {
    match event {
        DebuggerEvent::ProcessLaunched { target_process_id } => {
            shared.process_launched(target_process_id);
        }
        DebuggerEvent::DebuggingStopped => shared.debugging_stopped(StopCause::Reported),
    }
}
