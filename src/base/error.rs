use std::error;
use std::fmt;
use std::io;

/// Sensor-reported SOPAS error kinds, carried by `sFA` replies.
///
/// The wire index is the error's position in the telegram listing;
/// index 0 means success and is represented as `Ok(())`, not as a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SopasError {
    MethodInAccessDenied,
    MethodInUnknownIndex,
    VariableUnknownIndex,
    LocalConditionFailed,
    InvalidData,
    UnknownError,
    BufferOverflow,
    BufferUnderflow,
    UnknownType,
    VariableWriteAccessDenied,
    UnknownCmdForNameServer,
    UnknownColaCommand,
    MethodInServerBusy,
    FlexOutOfBounds,
    EventRegUnknownIndex,
    ColaValueOverflow,
    ColaInvalidCharacter,
    OsaiNoMessage,
    OsaiNoAnswerMessage,
    Internal,
    HubAddressCorrupted,
    HubAddressDecoding,
    HubAddressAddressExceeded,
    HubAddressBlankExpected,
    AsyncMethodsAreSuppressed,
    ComplexArraysNotSupported,
}

impl SopasError {
    /// Maps a wire error index (1..=26) from an `sFA` reply.
    pub fn from_index(index: u8) -> Option<SopasError> {
        use SopasError::*;
        Some(match index {
            1 => MethodInAccessDenied,
            2 => MethodInUnknownIndex,
            3 => VariableUnknownIndex,
            4 => LocalConditionFailed,
            5 => InvalidData,
            6 => UnknownError,
            7 => BufferOverflow,
            8 => BufferUnderflow,
            9 => UnknownType,
            10 => VariableWriteAccessDenied,
            11 => UnknownCmdForNameServer,
            12 => UnknownColaCommand,
            13 => MethodInServerBusy,
            14 => FlexOutOfBounds,
            15 => EventRegUnknownIndex,
            16 => ColaValueOverflow,
            17 => ColaInvalidCharacter,
            18 => OsaiNoMessage,
            19 => OsaiNoAnswerMessage,
            20 => Internal,
            21 => HubAddressCorrupted,
            22 => HubAddressDecoding,
            23 => HubAddressAddressExceeded,
            24 => HubAddressBlankExpected,
            25 => AsyncMethodsAreSuppressed,
            26 => ComplexArraysNotSupported,
            _ => return None,
        })
    }

    /// The stable error name from the SOPAS telegram listing.
    pub fn name(&self) -> &'static str {
        use SopasError::*;
        match self {
            MethodInAccessDenied => "Sopas_Error_METHODIN_ACCESSDENIED",
            MethodInUnknownIndex => "Sopas_Error_METHODIN_UNKNOWNINDEX",
            VariableUnknownIndex => "Sopas_Error_VARIABLE_UNKNOWNINDEX",
            LocalConditionFailed => "Sopas_Error_LOCALCONDITIONFAILED",
            InvalidData => "Sopas_Error_INVALID_DATA",
            UnknownError => "Sopas_Error_UNKNOWN_ERROR",
            BufferOverflow => "Sopas_Error_BUFFER_OVERFLOW",
            BufferUnderflow => "Sopas_Error_BUFFER_UNDERFLOW",
            UnknownType => "Sopas_Error_ERROR_UNKNOWN_TYPE",
            VariableWriteAccessDenied => "Sopas_Error_VARIABLE_WRITE_ACCESSDENIED",
            UnknownCmdForNameServer => "Sopas_Error_UNKNOWN_CMD_FOR_NAMESERVER",
            UnknownColaCommand => "Sopas_Error_UNKNOWN_COLA_COMMAND",
            MethodInServerBusy => "Sopas_Error_METHODIN_SERVER_BUSY",
            FlexOutOfBounds => "Sopas_Error_FLEX_OUT_OF_BOUNDS",
            EventRegUnknownIndex => "Sopas_Error_EVENTREG_UNKNOWNINDEX",
            ColaValueOverflow => "Sopas_Error_COLA_A_VALUE_OVERFLOW",
            ColaInvalidCharacter => "Sopas_Error_COLA_A_INVALID_CHARACTER",
            OsaiNoMessage => "Sopas_Error_OSAI_NO_MESSAGE",
            OsaiNoAnswerMessage => "Sopas_Error_OSAI_NO_ANSWER_MESSAGE",
            Internal => "Sopas_Error_INTERNAL",
            HubAddressCorrupted => "Sopas_Error_HubAddressCorrupted",
            HubAddressDecoding => "Sopas_Error_HubAddressDecoding",
            HubAddressAddressExceeded => "Sopas_Error_HubAddressAddressExceeded",
            HubAddressBlankExpected => "Sopas_Error_HubAddressBlankExpected",
            AsyncMethodsAreSuppressed => "Sopas_Error_AsyncMethodsAreSuppressed",
            ComplexArraysNotSupported => "Sopas_Error_ComplexArraysNotSupported",
        }
    }
}

impl fmt::Display for SopasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors surfaced by the driver.
#[derive(Debug)]
pub enum Error {
    /// The sensor rejected a command with an `sFA` error reply.
    Sopas(SopasError),

    /// Generic failure: refused logins, rejected status codes, connect errors.
    CustomError { description: String },

    /// A telegram violated its framing or declared structure.
    InvalidDatagram { description: String },

    /// A reply could not be classified for the issued command, or the
    /// command was refused locally.
    CommandFailure { description: String },

    /// Sending on the socket failed.
    SocketSend(io::Error),

    /// Receiving from the socket failed.
    SocketRecv(io::Error),
}

impl Error {
    pub fn custom(description: impl Into<String>) -> Error {
        Error::CustomError {
            description: description.into(),
        }
    }

    pub fn invalid_datagram(description: impl Into<String>) -> Error {
        Error::InvalidDatagram {
            description: description.into(),
        }
    }

    pub fn command_failure(description: impl Into<String>) -> Error {
        Error::CommandFailure {
            description: description.into(),
        }
    }

    /// Stable enumerator name, suitable for direct logging.
    pub fn name(&self) -> &'static str {
        match self {
            Error::Sopas(e) => e.name(),
            Error::CustomError { .. } => "CustomError",
            Error::InvalidDatagram { .. } => "InvalidDatagram",
            Error::CommandFailure { .. } => "CommandFailure",
            Error::SocketSend(_) => "SocketSend",
            Error::SocketRecv(_) => "SocketRecv",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Sopas(e) => f.write_str(e.name()),
            Error::CustomError { description } => write!(f, "CustomError: {}", description),
            Error::InvalidDatagram { description } => write!(f, "InvalidDatagram: {}", description),
            Error::CommandFailure { description } => write!(f, "CommandFailure: {}", description),
            Error::SocketSend(err) => write!(f, "SocketSend: {}", err),
            Error::SocketRecv(err) => write!(f, "SocketRecv: {}", err),
        }
    }
}

impl error::Error for Error {}

/// A specialized `Result` type for driver operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sopas_index_mapping() {
        assert_eq!(
            SopasError::from_index(1),
            Some(SopasError::MethodInAccessDenied)
        );
        assert_eq!(SopasError::from_index(7), Some(SopasError::BufferOverflow));
        assert_eq!(SopasError::from_index(8), Some(SopasError::BufferUnderflow));
        assert_eq!(
            SopasError::from_index(26),
            Some(SopasError::ComplexArraysNotSupported)
        );
        assert_eq!(SopasError::from_index(0), None);
        assert_eq!(SopasError::from_index(27), None);
    }

    #[test]
    fn stable_names() {
        assert_eq!(
            SopasError::BufferUnderflow.to_string(),
            "Sopas_Error_BUFFER_UNDERFLOW"
        );
        assert_eq!(
            Error::Sopas(SopasError::MethodInAccessDenied).name(),
            "Sopas_Error_METHODIN_ACCESSDENIED"
        );
        assert_eq!(Error::custom("x").name(), "CustomError");
        assert_eq!(Error::invalid_datagram("x").name(), "InvalidDatagram");
    }

    #[test]
    fn display_carries_description() {
        let err = Error::invalid_datagram("telegram ended before year");
        assert_eq!(
            err.to_string(),
            "InvalidDatagram: telegram ended before year"
        );
    }
}
