use std::time::Duration;

/// Default TCP port of the SOPAS-ASCII (CoLa-A) interface.
pub const DEFAULT_SOPAS_PORT: u16 = 2111;

/// Default timeout applied to connect, send and receive.
pub const DEFAULT_CHANNEL_TIMEOUT: Duration = Duration::from_secs(2);

/// Password hash granting "authorized client" access, from the telegram listing.
pub const DEFAULT_CLIENT_PW_HASH: u32 = 0xF472_4744;

/// Access level required for configuration commands (authorized client).
pub const DEFAULT_ACCESS_MODE: u8 = 3;

/// Default multi-echo filter selection (2 = last echo).
pub const DEFAULT_ECHO_FILTER: u8 = 2;

/// Receive buffer size used by the streaming receiver thread.
pub const RECV_BUFFER_SIZE: usize = 2 * 4096;

/// Receive buffer size for configuration replies.
pub const REPLY_BUFFER_SIZE: usize = 4096;

/// Start-of-telegram delimiter.
pub const STX: u8 = 0x02;

/// End-of-telegram delimiter.
pub const ETX: u8 = 0x03;
