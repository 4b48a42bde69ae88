//! Public data types exchanged with user code.

use std::time::SystemTime;

/// One revolution's worth of range and intensity samples.
///
/// The scan handed to the stream callback is a reference into the
/// receiver's working buffer and is only valid for the duration of the
/// callback; clone it to keep it.
///
/// Invariants: `ranges`, `intensities`, `sin_map` and `cos_map` all hold
/// `n_vals` entries, and once a stream has established `n_vals` it does
/// not change. `sin_map`/`cos_map` are filled once, when the beam count
/// first becomes known, and reused for every subsequent scan.
#[derive(Debug, Clone)]
pub struct Scan {
    /// Number of beams per revolution.
    pub n_vals: u32,
    /// Metric distance per beam, in meters.
    pub ranges: Vec<f32>,
    /// Reflectivity per beam.
    pub intensities: Vec<f32>,
    /// Sensor-frame angle of the first beam, in radians
    /// (0 = straight ahead, counterclockwise positive).
    pub start_angle: f64,
    /// Sensor-frame angle of the last beam, in radians.
    pub end_angle: f64,
    /// Angular step between beams, in radians.
    pub ang_increment: f64,
    /// Precomputed sine of each beam angle.
    pub sin_map: Vec<f32>,
    /// Precomputed cosine of each beam angle.
    pub cos_map: Vec<f32>,
    /// Wall-clock stamp reconstructed from the telegram's date/time block.
    pub time: SystemTime,
}

impl Scan {
    pub fn new() -> Scan {
        Scan {
            n_vals: 0,
            ranges: Vec::new(),
            intensities: Vec::new(),
            start_angle: 0.0,
            end_angle: 0.0,
            ang_increment: 0.0,
            sin_map: Vec::new(),
            cos_map: Vec::new(),
            time: SystemTime::UNIX_EPOCH,
        }
    }
}

impl Default for Scan {
    fn default() -> Scan {
        Scan::new()
    }
}

/// Desired scan geometry and rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LMSConfigParams {
    /// Scan frequency in hertz.
    pub frequency: f64,
    /// Angular resolution; encoded as `resolution * 10000` on the wire.
    pub resolution: f64,
    /// Window start in sensor-frame radians, roughly −95°.
    pub start_angle: f64,
    /// Window end in sensor-frame radians, roughly +95°.
    pub end_angle: f64,
}

/// Callback invoked on the receiver thread for every completed scan.
///
/// It must be thread-safe with respect to that thread and should not
/// block indefinitely: the socket is not drained while it runs.
pub type ScanCallback = dyn Fn(&Scan) + Send + Sync;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_scan_is_empty() {
        let scan = Scan::new();
        assert_eq!(scan.n_vals, 0);
        assert!(scan.ranges.is_empty());
        assert!(scan.intensities.is_empty());
        assert_eq!(scan.time, SystemTime::UNIX_EPOCH);
    }
}
