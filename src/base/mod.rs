//! Driver infrastructure: error types and the blocking TCP channel.

mod channel;
mod error;

pub use self::channel::{Channel, ChannelTimeouts};
pub use self::error::{Error, Result, SopasError};
