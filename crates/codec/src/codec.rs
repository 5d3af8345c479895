//! Frame decoding and encoding.
//!
//! This module provides the pure [`decode`] function and
//! [`DebuggerEventCodec`], which implements the tokio-util `Decoder` and
//! `Encoder` traits on top of it.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{CodecError, MalformedPacket};
use crate::event::{DebuggerEvent, EventType, HEADER_LEN};

/// Decode the frame at the start of `bytes`.
///
/// Bytes beyond the end of the frame are ignored; they belong to the next
/// frame.
pub fn decode(bytes: &[u8]) -> Result<DebuggerEvent, MalformedPacket> {
    let needed = frame_len(bytes)?.ok_or(MalformedPacket::Truncated {
        needed: HEADER_LEN,
        available: bytes.len(),
    })?;
    if bytes.len() < needed {
        return Err(MalformedPacket::Truncated {
            needed,
            available: bytes.len(),
        });
    }

    let mut buf = &bytes[..needed];
    let event_type = EventType::try_from(buf.get_i32_le())?;
    let event = match event_type {
        EventType::ProcessLaunched => DebuggerEvent::ProcessLaunched {
            target_process_id: buf.get_i32_le(),
        },
        EventType::DebuggingStopped => DebuggerEvent::DebuggingStopped,
    };
    Ok(event)
}

/// Size of the frame at the start of `bytes`.
///
/// Returns `Ok(None)` while the header itself is incomplete, and an error if
/// the header carries an unknown event type.
pub fn frame_len(bytes: &[u8]) -> Result<Option<usize>, MalformedPacket> {
    if bytes.len() < HEADER_LEN {
        return Ok(None);
    }
    let code = (&bytes[..HEADER_LEN]).get_i32_le();
    let event_type = EventType::try_from(code)?;
    Ok(Some(event_type.frame_len()))
}

/// Encode a single event into its wire form.
pub fn encode(event: DebuggerEvent) -> Bytes {
    let mut buf = BytesMut::with_capacity(event.event_type().frame_len());
    put_event(event, &mut buf);
    buf.freeze()
}

fn put_event(event: DebuggerEvent, dst: &mut BytesMut) {
    dst.put_i32_le(event.event_type().code());
    if let DebuggerEvent::ProcessLaunched { target_process_id } = event {
        dst.put_i32_le(target_process_id);
    }
}

/// Codec for debugger event frames.
///
/// Decoding consumes exactly one frame per call and leaves partial frames in
/// the buffer until more bytes arrive.
///
/// # Example
///
/// ```ignore
/// use tokio_util::codec::FramedRead;
/// use codec::DebuggerEventCodec;
///
/// let framed = FramedRead::new(stream, DebuggerEventCodec::new());
/// ```
#[derive(Debug, Clone, Default)]
pub struct DebuggerEventCodec {
    _private: (),
}

impl DebuggerEventCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for DebuggerEventCodec {
    type Item = DebuggerEvent;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(total_length) = frame_len(src)? else {
            src.reserve(HEADER_LEN - src.len());
            return Ok(None);
        };

        if src.len() < total_length {
            src.reserve(total_length - src.len());
            return Ok(None);
        }

        let frame = src.split_to(total_length);
        let event = decode(&frame)?;
        tracing::trace!(?event, "decoded debugger event");
        Ok(Some(event))
    }
}

impl Encoder<DebuggerEvent> for DebuggerEventCodec {
    type Error = CodecError;

    fn encode(&mut self, item: DebuggerEvent, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.event_type().frame_len());
        put_event(item, dst);
        Ok(())
    }
}
