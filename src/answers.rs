//! Classification of inbound SOPAS-ASCII replies.
//!
//! A reply frame is `STX <method> <rest> ETX` where `<method>` is a
//! three-letter token (`sAN`/`sRA`/`sWA`/`sEA`/`sSN`/`sFA`). `sFA`
//! carries a sensor-reported error index; everything else is judged by
//! the per-command status predicate.

use crate::base::{Error, Result, SopasError};
use crate::cmds::SopasCommand;
use crate::internals::{ETX, STX};
use log::debug;

/// True iff `data` is one well-formed reply frame: long enough to carry
/// a method token and containing exactly one `STX` and one `ETX`.
///
/// Multiple delimiters mean several messages were glued into one read,
/// which can happen when a timed-out reply arrives together with the
/// next one.
pub fn validate_reply(data: &[u8]) -> bool {
    if data.len() <= 6 {
        return false;
    }
    let n_stx = data.iter().filter(|&&b| b == STX).count();
    let n_etx = data.iter().filter(|&&b| b == ETX).count();
    n_stx == 1 && n_etx == 1
}

/// The three-letter method token following `STX`.
pub(crate) fn reply_method(data: &[u8]) -> Option<&str> {
    data.get(1..4).and_then(|m| std::str::from_utf8(m).ok())
}

/// The success predicate for a reply status code, by command name.
/// Commands outside the catalogue require status 1.
pub fn status_ok(cmd_name: &str, status: i32) -> bool {
    match SopasCommand::from_name(cmd_name) {
        Some(cmd) => cmd.status_ok(status),
        None => status == 1,
    }
}

/// Classifies one complete reply frame into `Ok(())` or the mapped error.
pub fn classify_reply(data: &[u8]) -> Result<()> {
    if !validate_reply(data) || data[0] != STX || data[data.len() - 1] != ETX {
        return Err(Error::invalid_datagram(format!(
            "malformed reply frame ({} bytes)",
            data.len()
        )));
    }
    let payload = std::str::from_utf8(&data[1..data.len() - 1])
        .map_err(|_| Error::invalid_datagram("reply is not ASCII"))?;
    let mut tokens = payload.split_ascii_whitespace();
    let method = tokens
        .next()
        .ok_or_else(|| Error::invalid_datagram("empty reply payload"))?;

    if method == "sFA" {
        let index_token = tokens
            .next()
            .ok_or_else(|| Error::command_failure("sFA reply carries no error index"))?;
        let index = u8::from_str_radix(index_token, 16).map_err(|_| {
            Error::command_failure(format!("unparseable sFA error index {:?}", index_token))
        })?;
        return match index {
            0 => Ok(()),
            _ => match SopasError::from_index(index) {
                Some(err) => Err(Error::Sopas(err)),
                None => Err(Error::command_failure(format!(
                    "sFA error index {} out of range",
                    index
                ))),
            },
        };
    }

    let cmd_name = tokens
        .next()
        .ok_or_else(|| Error::command_failure("reply carries no command name"))?;
    match tokens.next() {
        Some(token) => {
            let status: i32 = token.parse().map_err(|_| {
                Error::command_failure(format!(
                    "unparseable status {:?} in reply to {}",
                    token, cmd_name
                ))
            })?;
            if status_ok(cmd_name, status) {
                debug!("command {} succeeded", cmd_name);
                Ok(())
            } else {
                Err(Error::custom(format!(
                    "{} replied with status {}",
                    cmd_name, status
                )))
            }
        }
        // a bare acknowledgement carries no status token
        None => Ok(()),
    }
}

/// Extracts the next complete `STX … ETX` frame from an accumulation
/// buffer, discarding any noise before the `STX`. Returns `None` when no
/// complete frame is buffered yet.
pub(crate) fn take_frame(pending: &mut Vec<u8>) -> Option<Vec<u8>> {
    let stx = pending.iter().position(|&b| b == STX)?;
    if stx > 0 {
        pending.drain(..stx);
    }
    let etx = pending.iter().position(|&b| b == ETX)?;
    Some(pending.drain(..=etx).collect())
}

/// True iff `frame` contains `needle` as a subslice.
pub(crate) fn mentions(frame: &[u8], needle: &[u8]) -> bool {
    frame.windows(needle.len()).any(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_counts_delimiters() {
        assert!(validate_reply(b"\x02sAN SetAccessMode 1\x03"));
        assert!(!validate_reply(b"\x02sAN\x03")); // too short
        assert!(!validate_reply(b"\x02sAN Run 1\x03\x02sEA LMDscandata 0\x03"));
        assert!(!validate_reply(b"\x02sAN SetAccessMode 1"));
        assert!(!validate_reply(b"sAN SetAccessMode 1\x03"));
    }

    #[test]
    fn login_accepted() {
        assert!(classify_reply(b"\x02sAN SetAccessMode 1\x03").is_ok());
    }

    #[test]
    fn login_denied_is_custom_error() {
        match classify_reply(b"\x02sAN SetAccessMode 0\x03") {
            Err(Error::CustomError { .. }) => {}
            other => panic!("expected CustomError, got {:?}", other),
        }
    }

    #[test]
    fn sensor_error_reply() {
        match classify_reply(b"\x02sFA 08\x03") {
            Err(Error::Sopas(SopasError::BufferUnderflow)) => {}
            other => panic!("expected BufferUnderflow, got {:?}", other),
        }
        match classify_reply(b"\x02sFA 01\x03") {
            Err(Error::Sopas(SopasError::MethodInAccessDenied)) => {}
            other => panic!("expected MethodInAccessDenied, got {:?}", other),
        }
    }

    #[test]
    fn sensor_error_index_out_of_range() {
        match classify_reply(b"\x02sFA 7F\x03") {
            Err(Error::CommandFailure { .. }) => {}
            other => panic!("expected CommandFailure, got {:?}", other),
        }
    }

    #[test]
    fn ack_without_status_is_ok() {
        assert!(classify_reply(b"\x02sWA TSCTCSrvAddr\x03").is_ok());
    }

    #[test]
    fn glued_replies_are_invalid() {
        match classify_reply(b"\x02sAN Run 1\x03\x02sEA LMDscandata 0\x03") {
            Err(Error::InvalidDatagram { .. }) => {}
            other => panic!("expected InvalidDatagram, got {:?}", other),
        }
    }

    #[test]
    fn status_predicate_table() {
        // ok iff status == 0
        for cmd in ["mLMPsetscancfg", "LMCstopmeas", "LMCstartmeas"] {
            assert!(status_ok(cmd, 0));
            assert!(!status_ok(cmd, 1));
            assert!(!status_ok(cmd, 2));
        }
        // ok iff status == 1
        for cmd in ["mEEwriteall", "Run", "SetAccessMode", "TSCRole", "FREchoFilter"] {
            assert!(status_ok(cmd, 1));
            assert!(!status_ok(cmd, 0));
            assert!(!status_ok(cmd, 2));
        }
        // subscription value, never an error
        for status in [-1, 0, 1, 2] {
            assert!(status_ok("LMDscandata", status));
        }
        // unknown commands require status 1
        assert!(status_ok("mNPOSGetData", 1));
        assert!(!status_ok("mNPOSGetData", 0));
    }

    #[test]
    fn scan_subscription_reply_is_ok() {
        assert!(classify_reply(b"\x02sEA LMDscandata 0\x03").is_ok());
        assert!(classify_reply(b"\x02sEA LMDscandata 1\x03").is_ok());
    }

    #[test]
    fn take_frame_skips_noise() {
        let mut pending = b"junk\x02sEA LMDscandata 0\x03tail".to_vec();
        let frame = take_frame(&mut pending).unwrap();
        assert_eq!(frame, b"\x02sEA LMDscandata 0\x03");
        assert_eq!(pending, b"tail");
        assert!(take_frame(&mut pending).is_none());
    }

    #[test]
    fn take_frame_extracts_in_order() {
        let mut pending = b"\x02sSN LMDscandata 1\x03\x02sEA LMDscandata 0\x03".to_vec();
        assert_eq!(
            take_frame(&mut pending).unwrap(),
            b"\x02sSN LMDscandata 1\x03"
        );
        assert_eq!(
            take_frame(&mut pending).unwrap(),
            b"\x02sEA LMDscandata 0\x03"
        );
        assert!(pending.is_empty());
    }

    #[test]
    fn take_frame_waits_for_etx() {
        let mut pending = b"\x02sEA LMDscan".to_vec();
        assert!(take_frame(&mut pending).is_none());
        pending.extend_from_slice(b"data 0\x03");
        assert!(take_frame(&mut pending).is_some());
    }

    #[test]
    fn mentions_subslice() {
        assert!(mentions(b"\x02sEA LMDscandata 0\x03", b"LMDscandata"));
        assert!(!mentions(b"\x02sAN SetAccessMode 1\x03", b"LMDscandata"));
    }
}
