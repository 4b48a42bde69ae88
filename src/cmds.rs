//! The outbound SOPAS-ASCII command catalogue.
//!
//! Every formatter returns a complete `STX … ETX` frame ready for the
//! wire. The catalogue is closed: these are exactly the commands needed
//! to bring up and tear down a scan stream.

use crate::internals::{ETX, STX};

/// The closed set of commands the driver issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SopasCommand {
    SetAccessMode,
    TscRole,
    TscTcInterface,
    TscTcSrvAddr,
    SetScanCfg,
    ScanDataCfg,
    EchoFilter,
    OutputRange,
    WriteAll,
    Run,
    ScanData,
    StopMeas,
    StartMeas,
}

impl SopasCommand {
    /// The command name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            SopasCommand::SetAccessMode => "SetAccessMode",
            SopasCommand::TscRole => "TSCRole",
            SopasCommand::TscTcInterface => "TSCTCInterface",
            SopasCommand::TscTcSrvAddr => "TSCTCSrvAddr",
            SopasCommand::SetScanCfg => "mLMPsetscancfg",
            SopasCommand::ScanDataCfg => "LMDscandatacfg",
            SopasCommand::EchoFilter => "FREchoFilter",
            SopasCommand::OutputRange => "LMPoutputRange",
            SopasCommand::WriteAll => "mEEwriteall",
            SopasCommand::Run => "Run",
            SopasCommand::ScanData => "LMDscandata",
            SopasCommand::StopMeas => "LMCstopmeas",
            SopasCommand::StartMeas => "LMCstartmeas",
        }
    }

    /// Looks a command up by its wire name.
    pub fn from_name(name: &str) -> Option<SopasCommand> {
        use SopasCommand::*;
        [
            SetAccessMode,
            TscRole,
            TscTcInterface,
            TscTcSrvAddr,
            SetScanCfg,
            ScanDataCfg,
            EchoFilter,
            OutputRange,
            WriteAll,
            Run,
            ScanData,
            StopMeas,
            StartMeas,
        ]
        .into_iter()
        .find(|cmd| cmd.name() == name)
    }

    /// Whether `status` in a reply to this command indicates success.
    pub fn status_ok(self, status: i32) -> bool {
        match self {
            SopasCommand::SetScanCfg | SopasCommand::StopMeas | SopasCommand::StartMeas => {
                status == 0
            }
            SopasCommand::WriteAll | SopasCommand::Run => status == 1,
            // 0 means stop, 1 means start; neither is an error
            SopasCommand::ScanData => true,
            _ => status == 1,
        }
    }
}

fn frame(payload: String) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 2);
    out.push(STX);
    out.extend_from_slice(payload.as_bytes());
    out.push(ETX);
    out
}

/// `sMN SetAccessMode`: log in at the given access level.
pub fn set_access_mode(mode: u8, pw_hash: u32) -> Vec<u8> {
    frame(format!("sMN SetAccessMode {:02} {:08X}", mode, pw_hash))
}

/// `sWN TSCRole`: select the sensor's NTP role (1 = client).
pub fn tsc_role(role: u8) -> Vec<u8> {
    frame(format!("sWN TSCRole {:02}", role))
}

/// `sWN TSCTCInterface`: select the time-sync interface (0 = ethernet).
pub fn tsc_tc_interface(interface: u8) -> Vec<u8> {
    frame(format!("sWN TSCTCInterface {:02}", interface))
}

/// `sWN TSCTCSrvAddr`: point the sensor at an NTP server, given as the
/// space-separated hex bytes produced by [`crate::utils::ip_to_hex_ascii`].
pub fn tsc_tc_srv_addr(ip_hex: &str) -> Vec<u8> {
    frame(format!("sWN TSCTCSrvAddr {}", ip_hex))
}

/// `sMN mLMPsetscancfg`: program frequency (centihertz) and the angular
/// window (milli-degrees in the LMS wire frame).
///
/// The start and end angles must carry an explicit sign character; the
/// unsigned fields carry a literal `+` prefix.
pub fn set_scan_cfg(freq_chz: u32, ang_incr_mdeg: u32, start_mdeg: i32, end_mdeg: i32) -> Vec<u8> {
    frame(format!(
        "sMN mLMPsetscancfg +{} +1 +{} {:+} {:+}",
        freq_chz, ang_incr_mdeg, start_mdeg, end_mdeg
    ))
}

/// `sWN LMDscandatacfg`: data-channel selection.
///
/// The payload is not fully documented by the device; this constant is
/// known to enable distance plus remission in the scan telegrams.
pub fn scan_data_cfg() -> Vec<u8> {
    frame("sWN LMDscandatacfg 00 00 1 0 0 0 00 0 0 0 1 1".to_owned())
}

/// `sWN FREchoFilter`: multi-echo filter selection.
pub fn echo_filter(mode: u8) -> Vec<u8> {
    frame(format!("sWN FREchoFilter {}", mode))
}

/// `sWN LMPoutputRange`: the output window matching the scan config.
pub fn output_range(ang_incr_mdeg: u32, start_mdeg: i32, end_mdeg: i32) -> Vec<u8> {
    frame(format!(
        "sWN LMPoutputRange 1 +{} {:+} {:+}",
        ang_incr_mdeg, start_mdeg, end_mdeg
    ))
}

/// `sMN mEEwriteall`: persist the configuration to flash.
pub fn write_all() -> Vec<u8> {
    frame("sMN mEEwriteall".to_owned())
}

/// `sMN Run`: leave configuration mode.
pub fn run() -> Vec<u8> {
    frame("sMN Run".to_owned())
}

/// `sEN LMDscandata`: subscribe to (1) or unsubscribe from (0) the
/// measurement stream.
pub fn scan_data(enable: bool) -> Vec<u8> {
    frame(format!("sEN LMDscandata {}", enable as u8))
}

/// `sMN LMCstopmeas`: stop the measurement unit.
pub fn stop_meas() -> Vec<u8> {
    frame("sMN LMCstopmeas".to_owned())
}

/// `sMN LMCstartmeas`: start the measurement unit.
pub fn start_meas() -> Vec<u8> {
    frame("sMN LMCstartmeas".to_owned())
}
