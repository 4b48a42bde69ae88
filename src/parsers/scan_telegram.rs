//! Parser for the ASCII `LMDscandata` measurement telegram.
//!
//! One telegram per revolution: a long, whitespace-separated header
//! followed by a 16-bit channel block (distances), an 8-bit channel
//! block (remission), and optional position/name/comment/time sections.
//! Integers are hex unless noted; angles are LMS wire degrees scaled by
//! 10000.

use crate::base::{Error, Result};
use crate::types::Scan;
use crate::utils::angle_from_lms;
use log::debug;
use std::str::SplitAsciiWhitespace;
use std::time::{Duration, SystemTime};

// Average civil durations used by the sensor's time stamp reconstruction.
// Not a true calendar conversion; kept for wire compatibility.
const SECONDS_PER_YEAR: u64 = 31_556_952;
const SECONDS_PER_MONTH: u64 = 2_629_746;
const SECONDS_PER_DAY: u64 = 86_400;

/// Sequential cursor over the telegram tokens.
struct Tokens<'a> {
    inner: SplitAsciiWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(payload: &'a str) -> Tokens<'a> {
        Tokens {
            inner: payload.split_ascii_whitespace(),
        }
    }

    fn next(&mut self, what: &'static str) -> Result<&'a str> {
        self.inner
            .next()
            .ok_or_else(|| Error::invalid_datagram(format!("telegram ended before {}", what)))
    }

    fn hex_u32(&mut self, what: &'static str) -> Result<u32> {
        let token = self.next(what)?;
        u32::from_str_radix(token, 16)
            .map_err(|_| Error::invalid_datagram(format!("bad hex {} {:?}", what, token)))
    }

    fn hex_i32(&mut self, what: &'static str) -> Result<i32> {
        Ok(self.hex_u32(what)? as i32)
    }

    fn hex_i16(&mut self, what: &'static str) -> Result<i16> {
        let token = self.next(what)?;
        u16::from_str_radix(token, 16)
            .map(|v| v as i16)
            .map_err(|_| Error::invalid_datagram(format!("bad hex {} {:?}", what, token)))
    }
}

/// One decoded data channel. Lives only for the duration of a single
/// telegram parse.
struct Channel {
    description: String,
    /// Angular step in LMS degrees.
    ang_incr: f64,
    /// Per-sample sensor-frame angles, radians.
    angles: Vec<f32>,
    /// Decoded samples after the offset/scale transform.
    values: Vec<f32>,
}

fn parse_channel(tokens: &mut Tokens) -> Result<Channel> {
    let description = tokens.next("channel description")?.to_owned();
    let scale = match tokens.next("scale factor")? {
        "3F800000" => 1.0f32,
        "40000000" => 2.0f32,
        other => {
            return Err(Error::invalid_datagram(format!(
                "unexpected scale factor {:?}",
                other
            )))
        }
    };
    let offset = tokens.hex_i32("offset")? as f32;
    let start_angle = tokens.hex_i32("start angle")? as f64 / 10000.0;
    let ang_incr = tokens.hex_i16("angular increment")? as f64 / 10000.0;
    let n_values = tokens.hex_u32("value count")? as usize;

    let mut values = Vec::with_capacity(n_values);
    for _ in 0..n_values {
        let raw = tokens.hex_u32("sample")?;
        values.push(offset + scale * raw as f32 / 1000.0);
    }
    let angles = (0..n_values)
        .map(|i| angle_from_lms(start_angle + i as f64 * ang_incr) as f32)
        .collect();

    Ok(Channel {
        description,
        ang_incr,
        angles,
        values,
    })
}

/// Parses one complete telegram payload (the bytes between `STX` and
/// `ETX`) into `scan`.
///
/// Returns `Ok(true)` when the scan was filled, `Ok(false)` when the
/// telegram carried no time stamp and was skipped. The first successful
/// parse fixes `n_vals`, the angular geometry and the trig maps; later
/// telegrams only overwrite `ranges`, `intensities` and `time`.
pub(crate) fn parse_scan_telegram(payload: &[u8], scan: &mut Scan) -> Result<bool> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| Error::invalid_datagram("telegram is not ASCII"))?;
    let mut tokens = Tokens::new(text);

    let _method = tokens.next("method")?;
    let _command = tokens.next("command name")?;
    let _proto_version = tokens.next("protocol version")?;
    let _device_num = tokens.next("device number")?;
    let _serial_num = tokens.hex_u32("serial number")?;
    let _device_status1 = tokens.next("device status")?;
    let _device_status2 = tokens.next("device status")?;
    let _num_telegrams = tokens.next("telegram counter")?;
    let _num_scans = tokens.next("scan counter")?;
    let _time_since_boot_us = tokens.hex_u32("time since boot")?;
    let _time_of_transmission_us = tokens.hex_u32("time of transmission")?;
    for _ in 0..4 {
        tokens.next("digital IO status")?;
    }
    let _layer_angle = tokens.next("layer angle")?;
    let _scan_freq = tokens.hex_u32("scan frequency")?;
    let _measurement_freq = tokens.hex_u32("measurement frequency")?;
    let encoder = tokens.hex_u32("encoder count")?;
    if encoder != 0 {
        tokens.next("encoder position")?;
        tokens.next("encoder speed")?;
    }

    let num_16bit_channels = tokens.hex_u32("16-bit channel count")?;
    if num_16bit_channels != 1 {
        return Err(Error::invalid_datagram(format!(
            "expected one 16-bit channel, got {}",
            num_16bit_channels
        )));
    }
    let range_channel = parse_channel(&mut tokens)?;

    let num_8bit_channels = tokens.hex_u32("8-bit channel count")?;
    if num_8bit_channels != 1 {
        return Err(Error::invalid_datagram(format!(
            "expected one 8-bit channel, got {}",
            num_8bit_channels
        )));
    }
    let intensity_channel = parse_channel(&mut tokens)?;

    let _position = tokens.hex_u32("position flag")?;
    let name_exists = tokens.hex_u32("name flag")?;
    if name_exists == 1 {
        tokens.next("name length")?;
        tokens.next("name")?;
    }
    let comment_exists = tokens.hex_u32("comment flag")?;
    if comment_exists == 1 {
        tokens.next("comment length")?;
        tokens.next("comment")?;
    }
    let time_exists = tokens.hex_u32("time flag")?;
    if time_exists != 1 {
        debug!("scan telegram without time stamp, skipping");
        return Ok(false);
    }
    let year = tokens.hex_u32("year")? as u64;
    let month = tokens.hex_u32("month")? as u64;
    let day = tokens.hex_u32("day")? as u64;
    let hour = tokens.hex_u32("hour")? as u64;
    let minute = tokens.hex_u32("minute")? as u64;
    let second = tokens.hex_u32("second")? as u64;
    let micros = tokens.hex_u32("microsecond")? as u64;
    let stamp = SystemTime::UNIX_EPOCH
        + Duration::from_secs(
            year * SECONDS_PER_YEAR
                + month * SECONDS_PER_MONTH
                + day * SECONDS_PER_DAY
                + hour * 3600
                + minute * 60
                + second,
        )
        + Duration::from_micros(micros);

    if !range_channel.description.contains("DIST") {
        return Err(Error::invalid_datagram(format!(
            "first 16-bit channel is {:?}, not a range channel",
            range_channel.description
        )));
    }
    if !intensity_channel.description.contains("RSSI") {
        return Err(Error::invalid_datagram(format!(
            "first 8-bit channel is {:?}, not an intensity channel",
            intensity_channel.description
        )));
    }
    if range_channel.values.len() != intensity_channel.values.len() {
        return Err(Error::invalid_datagram(format!(
            "ranges and intensities differ in size: {} vs {}",
            range_channel.values.len(),
            intensity_channel.values.len()
        )));
    }
    if range_channel.values.is_empty() {
        return Err(Error::invalid_datagram("range channel is empty"));
    }

    if scan.n_vals == 0 {
        // first telegram on this stream fixes the geometry
        let n_vals = range_channel.values.len();
        scan.n_vals = n_vals as u32;
        scan.ranges = vec![0.0; n_vals];
        scan.intensities = vec![0.0; n_vals];
        scan.ang_increment = range_channel.ang_incr.to_radians();
        scan.start_angle = range_channel.angles[0] as f64;
        scan.end_angle = range_channel.angles[n_vals - 1] as f64;
        scan.sin_map = range_channel.angles.iter().map(|a| a.sin()).collect();
        scan.cos_map = range_channel.angles.iter().map(|a| a.cos()).collect();
    } else if scan.n_vals as usize != range_channel.values.len() {
        return Err(Error::invalid_datagram(format!(
            "beam count changed mid-stream: {} -> {}",
            scan.n_vals,
            range_channel.values.len()
        )));
    }

    scan.ranges.copy_from_slice(&range_channel.values);
    scan.intensities.copy_from_slice(&intensity_channel.values);
    scan.time = stamp;
    Ok(true)
}

#[cfg(test)]
pub(crate) mod test_support {
    /// A telegram payload with one DIST and one RSSI channel of `n`
    /// samples each. Ranges are `1.0 .. n` meters, intensities
    /// `0.01 .. n/100`; the angular window starts at -95 wire degrees
    /// with 0.0475 degree steps.
    pub fn telegram_payload(n: usize) -> String {
        let mut out = String::from(
            "sSN LMDscandata 1 1 89A27F 0 0 1 1 13F3AB 13F4CD 0 0 0 0 0 9C4 21C 0 1 ",
        );
        out.push_str("DIST1 3F800000 00000000 FFF18110 1DB ");
        out.push_str(&format!("{:X}", n));
        for i in 0..n {
            out.push_str(&format!(" {:X}", (i + 1) * 1000));
        }
        out.push_str(" 1 RSSI1 3F800000 00000000 FFF18110 1DB ");
        out.push_str(&format!("{:X}", n));
        for i in 0..n {
            out.push_str(&format!(" {:X}", (i + 1) * 10));
        }
        // position, name, comment absent; time block present
        out.push_str(" 0 0 0 1 7E8 7 1A C 22 38 DE42");
        out
    }

    /// The same payload framed with STX/ETX.
    pub fn telegram_frame(n: usize) -> Vec<u8> {
        let mut out = vec![0x02];
        out.extend_from_slice(telegram_payload(n).as_bytes());
        out.push(0x03);
        out
    }
}
