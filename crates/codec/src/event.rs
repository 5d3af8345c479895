//! Debugger event types.

use crate::error::MalformedPacket;

/// Size of the event type code that starts every frame.
pub const HEADER_LEN: usize = 4;

/// Event type codes on the wire.
///
/// The numbering is shared with the debuggee-side encoder. New codes may be
/// added but existing ones must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum EventType {
    ProcessLaunched = 0,
    DebuggingStopped = 1,
}

impl EventType {
    /// Payload size that follows the header for this event type.
    pub fn payload_len(self) -> usize {
        match self {
            EventType::ProcessLaunched => 4,
            EventType::DebuggingStopped => 0,
        }
    }

    /// Total frame size, header included.
    pub fn frame_len(self) -> usize {
        HEADER_LEN + self.payload_len()
    }

    pub fn code(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for EventType {
    type Error = MalformedPacket;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EventType::ProcessLaunched),
            1 => Ok(EventType::DebuggingStopped),
            other => Err(MalformedPacket::UnknownEventType(other)),
        }
    }
}

/// A lifecycle notification sent by the debuggee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebuggerEvent {
    /// The test host started the process that should be debugged.
    ProcessLaunched { target_process_id: i32 },
    /// The debuggee finished; nothing more will be sent.
    DebuggingStopped,
}

impl DebuggerEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            DebuggerEvent::ProcessLaunched { .. } => EventType::ProcessLaunched,
            DebuggerEvent::DebuggingStopped => EventType::DebuggingStopped,
        }
    }
}
