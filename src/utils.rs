//! Conversions between host values and their SOPAS wire representations.

use crate::base::{Error, Result};
use byteorder::{BigEndian, ByteOrder};
use std::f64::consts::PI;
use std::net::Ipv4Addr;

const RAD2DEG: f64 = 180.0 / PI;
const DEG2RAD: f64 = PI / 180.0;

fn parse_ipv4(ip: &str) -> Result<Ipv4Addr> {
    ip.parse()
        .map_err(|_| Error::custom(format!("invalid IPv4 address: {:?}", ip)))
}

/// Parses a dotted-quad IPv4 address into its wire representation
/// (network byte order: the first octet occupies the most significant
/// byte of the host-order value).
pub fn ip_to_u32(ip: &str) -> Result<u32> {
    let addr = parse_ipv4(ip)?;
    Ok(BigEndian::read_u32(&addr.octets()).to_be())
}

/// Renders an IPv4 address as the space-separated uppercase hex bytes
/// SOPAS expects inside command payloads, e.g. `"C0 A8 5F 2C"`.
pub fn ip_to_hex_ascii(ip: &str) -> Result<String> {
    let addr = parse_ipv4(ip)?;
    let host = BigEndian::read_u32(&addr.octets());
    Ok(format!(
        "{:02X} {:02X} {:02X} {:02X}",
        (host >> 24) & 0xFF,
        (host >> 16) & 0xFF,
        (host >> 8) & 0xFF,
        host & 0xFF
    ))
}

/// Sensor-frame radians (0 = straight ahead, counterclockwise positive)
/// to LMS wire degrees (90 = straight ahead).
pub fn angle_to_lms(angle: f64) -> f64 {
    angle * RAD2DEG + 90.0
}

/// LMS wire degrees back to sensor-frame radians.
pub fn angle_from_lms(angle: f64) -> f64 {
    (angle - 90.0) * DEG2RAD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ip_hex_ascii() {
        assert_eq!(ip_to_hex_ascii("192.168.95.44").unwrap(), "C0 A8 5F 2C");
        assert_eq!(ip_to_hex_ascii("0.0.0.0").unwrap(), "00 00 00 00");
        assert_eq!(ip_to_hex_ascii("255.255.255.255").unwrap(), "FF FF FF FF");
    }

    #[test]
    fn ip_network_order() {
        // network byte order: octets appear in memory in wire order
        let ip = ip_to_u32("192.168.95.44").unwrap();
        assert_eq!(ip.to_ne_bytes(), [0xC0, 0xA8, 0x5F, 0x2C]);
    }

    #[test]
    fn ip_rejects_garbage() {
        assert!(ip_to_u32("192.168.95").is_err());
        assert!(ip_to_hex_ascii("not an ip").is_err());
    }

    #[test]
    fn angle_conversion() {
        assert!((angle_to_lms(0.0) - 90.0).abs() < 1e-12);
        assert!((angle_to_lms(-95.0 * DEG2RAD) - (-5.0)).abs() < 1e-9);
        assert!((angle_to_lms(95.0 * DEG2RAD) - 185.0).abs() < 1e-9);
    }

    #[test]
    fn angle_round_trip() {
        let mut x = -PI;
        while x <= PI {
            assert!((angle_from_lms(angle_to_lms(x)) - x).abs() < 1e-9);
            x += 0.01;
        }
    }
}
