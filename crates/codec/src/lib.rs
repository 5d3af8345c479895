//! Wire codec for the debugger event channel.
//!
//! A debuggee-side component reports lifecycle notifications (the test host
//! process was launched, debugging stopped) over a byte stream. Every frame
//! is a little-endian event type code followed by a payload whose shape
//! depends on the code:
//!
//! ```text
//! offset  size  field
//! 0       4     event type code (0 = ProcessLaunched, 1 = DebuggingStopped)
//! 4       4     target process id (ProcessLaunched only, signed)
//! ```
//!
//! [`decode`] is a pure function over a complete frame. [`DebuggerEventCodec`]
//! wraps the same rules in the tokio-util `Decoder`/`Encoder` traits so the
//! channel can reassemble frames from a stream.

mod codec;
mod error;
mod event;

pub use codec::{DebuggerEventCodec, decode, encode, frame_len};
pub use error::{CodecError, MalformedPacket};
pub use event::{DebuggerEvent, EventType, HEADER_LEN};
