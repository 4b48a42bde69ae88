//! Reassembly of the raw TCP byte stream into scan telegrams.

use crate::base::Result;
use crate::internals::{ETX, STX};
use crate::parsers::parse_scan_telegram;
use crate::types::Scan;
use log::warn;

/// Accumulates received chunks and yields a [`Scan`] for every complete,
/// valid telegram.
///
/// Frames are delimited by `STX`/`ETX` with no escaping. A closed frame
/// that does not begin with `STX` is logged and dropped; bytes after an
/// `ETX` are retained as the start of the next frame. The returned scan
/// borrows the batcher's working buffer and is valid until the next
/// `push`.
#[derive(Debug)]
pub struct ScanBatcher {
    buffer: Vec<u8>,
    scan: Scan,
}

impl ScanBatcher {
    pub fn new() -> ScanBatcher {
        ScanBatcher {
            buffer: Vec::with_capacity(4096),
            scan: Scan::new(),
        }
    }

    /// Pushes one received chunk, parsing every frame it completes.
    ///
    /// Returns a reference to the working scan if at least one telegram
    /// parsed successfully, `None` while a frame is still incomplete.
    /// Semantically invalid telegrams propagate `InvalidDatagram`.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Option<&Scan>> {
        let mut rest = chunk;
        let mut got_scan = false;

        while let Some(etx_index) = rest.iter().position(|&b| b == ETX) {
            self.buffer.extend_from_slice(&rest[..=etx_index]);
            rest = &rest[etx_index + 1..];

            if self.buffer.first() == Some(&STX) {
                let payload = &self.buffer[1..self.buffer.len() - 1];
                let parsed = parse_scan_telegram(payload, &mut self.scan);
                self.buffer.clear();
                if parsed? {
                    got_scan = true;
                }
            } else {
                warn!(
                    "dropping {} bytes of frame without STX prefix",
                    self.buffer.len()
                );
                self.buffer.clear();
            }
        }
        self.buffer.extend_from_slice(rest);

        Ok(if got_scan { Some(&self.scan) } else { None })
    }
}

impl Default for ScanBatcher {
    fn default() -> ScanBatcher {
        ScanBatcher::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Error;
    use crate::parsers::test_support::telegram_frame;

    #[test]
    fn whole_frame_in_one_push() {
        let mut batcher = ScanBatcher::new();
        let scan = batcher.push(&telegram_frame(5)).unwrap().unwrap();
        assert_eq!(scan.n_vals, 5);
        assert_eq!(scan.ranges[0], 1.0);
    }

    #[test]
    fn frame_split_into_single_bytes() {
        let mut batcher = ScanBatcher::new();
        let frame = telegram_frame(5);
        for &byte in &frame[..frame.len() - 1] {
            assert!(batcher.push(&[byte]).unwrap().is_none());
        }
        let scan = batcher
            .push(&frame[frame.len() - 1..])
            .unwrap()
            .expect("final byte closes the frame");
        assert_eq!(scan.n_vals, 5);
    }

    #[test]
    fn trailing_bytes_seed_the_next_frame() {
        let mut batcher = ScanBatcher::new();
        let frame = telegram_frame(5);

        // one and a half frames, then the remaining half
        let mut chunk = frame.clone();
        chunk.extend_from_slice(&frame[..10]);
        assert!(batcher.push(&chunk).unwrap().is_some());
        assert!(batcher.push(&frame[10..]).unwrap().is_some());
    }

    #[test]
    fn two_frames_in_one_chunk() {
        let mut batcher = ScanBatcher::new();
        let mut chunk = telegram_frame(5);
        chunk.extend_from_slice(&telegram_frame(5));
        let scan = batcher.push(&chunk).unwrap().expect("both frames parse");
        assert_eq!(scan.n_vals, 5);
    }

    #[test]
    fn junk_frame_is_dropped_not_fatal() {
        let mut batcher = ScanBatcher::new();
        // garbage closed by an ETX, e.g. the tail of a telegram cut off
        // by a reconnect
        assert!(batcher.push(b"A5 A6 A7\x03").unwrap().is_none());
        assert!(batcher.push(&telegram_frame(5)).unwrap().is_some());
    }

    #[test]
    fn invalid_telegram_is_fatal() {
        let mut batcher = ScanBatcher::new();
        match batcher.push(b"\x02sSN LMDscandata 1\x03") {
            Err(Error::InvalidDatagram { .. }) => {}
            other => panic!("expected InvalidDatagram, got {:?}", other),
        }
    }

    #[test]
    fn geometry_survives_across_pushes() {
        let mut batcher = ScanBatcher::new();
        batcher.push(&telegram_frame(5)).unwrap();
        let sin_ptr = {
            let scan = batcher.push(&telegram_frame(5)).unwrap().unwrap();
            scan.sin_map.as_ptr()
        };
        let scan = batcher.push(&telegram_frame(5)).unwrap().unwrap();
        assert_eq!(scan.sin_map.as_ptr(), sin_ptr);
        assert_eq!(scan.n_vals, 5);
    }
}
