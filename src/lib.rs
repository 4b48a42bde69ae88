//! # SICK LMS driver
//!
//! `sick_lms` drives SICK LMS-series 2D laser range finders over the
//! SOPAS-ASCII (CoLa-A) dialect: it logs in, programs scan geometry and
//! frequency, persists settings, subscribes to the measurement stream and
//! hands every completed [`Scan`] to a user callback on a dedicated
//! receiver thread.
//!
//! ```ignore
//! use sick_lms::{LmsDevice, LMSConfigParams, DEFAULT_SOPAS_PORT};
//!
//! let mut device = LmsDevice::connect("192.168.95.194", DEFAULT_SOPAS_PORT, |scan| {
//!     println!("scan with {} beams", scan.n_vals);
//! })?;
//! device.login()?;
//! device.set_scan_config(&LMSConfigParams {
//!     frequency: 25.0,
//!     resolution: 0.1667,
//!     start_angle: (-95.0f64).to_radians(),
//!     end_angle: 95.0f64.to_radians(),
//! })?;
//! device.run()?;
//! device.start_scan()?;
//! // ... consume scans ...
//! device.stop();
//! # Ok::<(), sick_lms::Error>(())
//! ```

mod answers;
pub mod base;
mod batcher;
pub mod cmds;
mod internals;
mod parsers;
pub mod types;
pub mod utils;

pub use crate::base::{Channel, ChannelTimeouts, Error, Result, SopasError};
pub use crate::batcher::ScanBatcher;
pub use crate::cmds::SopasCommand;
pub use crate::internals::{
    DEFAULT_ACCESS_MODE, DEFAULT_CLIENT_PW_HASH, DEFAULT_ECHO_FILTER, DEFAULT_SOPAS_PORT,
};
pub use crate::types::{LMSConfigParams, Scan, ScanCallback};

use crate::answers::{classify_reply, mentions, reply_method, take_frame};
use crate::internals::RECV_BUFFER_SIZE;
use log::{debug, error, info, trace, warn};
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeviceState {
    Connected,
    Streaming,
    Closed,
}

/// A SOPAS-ASCII connection to one LMS sensor.
///
/// The device owns the TCP channel and at most one receiver thread.
/// Configuration commands are strict request/reply with exactly one
/// command in flight, which `&mut self` enforces. While streaming, the
/// receiver thread owns the socket; the only shared state is an atomic
/// stop flag.
pub struct LmsDevice {
    channel: Channel,
    callback: Arc<ScanCallback>,
    stop: Arc<AtomicBool>,
    poller: Option<JoinHandle<()>>,
    stream_error: Arc<Mutex<Option<Error>>>,
    state: DeviceState,
}

impl LmsDevice {
    /// Connects to the sensor with the default 2 s timeouts.
    ///
    /// `callback` is invoked on the receiver thread for every completed
    /// scan once [`start_scan`](LmsDevice::start_scan) runs.
    pub fn connect<F>(sensor_ip: &str, port: u16, callback: F) -> Result<LmsDevice>
    where
        F: Fn(&Scan) + Send + Sync + 'static,
    {
        LmsDevice::connect_with_timeouts(sensor_ip, port, ChannelTimeouts::default(), callback)
    }

    /// Connects with explicit channel timeouts.
    pub fn connect_with_timeouts<F>(
        sensor_ip: &str,
        port: u16,
        timeouts: ChannelTimeouts,
        callback: F,
    ) -> Result<LmsDevice>
    where
        F: Fn(&Scan) + Send + Sync + 'static,
    {
        let channel = Channel::connect_with_timeouts(sensor_ip, port, timeouts)?;
        info!("connected to sensor at {}", channel.peer());
        Ok(LmsDevice {
            channel,
            callback: Arc::new(callback),
            stop: Arc::new(AtomicBool::new(false)),
            poller: None,
            stream_error: Arc::new(Mutex::new(None)),
            state: DeviceState::Connected,
        })
    }

    /// Sends one command frame and classifies the reply.
    fn command(&mut self, frame: Vec<u8>) -> Result<()> {
        if self.state != DeviceState::Connected {
            return Err(Error::command_failure(
                "device is streaming or closed, command refused",
            ));
        }
        debug!("command: {}", String::from_utf8_lossy(&frame));
        let reply = self.channel.invoke(&frame)?;
        debug!("reply: {}", String::from_utf8_lossy(&reply));
        classify_reply(&reply)
    }

    /// Logs in as authorized client with the default access mode and
    /// password hash.
    pub fn login(&mut self) -> Result<()> {
        self.set_access_mode(DEFAULT_ACCESS_MODE, DEFAULT_CLIENT_PW_HASH)
    }

    /// `SetAccessMode`: log in at the given access level.
    pub fn set_access_mode(&mut self, mode: u8, pw_hash: u32) -> Result<()> {
        self.command(cmds::set_access_mode(mode, pw_hash))
    }

    /// Makes the sensor an NTP client of `ntp_ip`: role 1 (client),
    /// interface 0 (ethernet), then the server address.
    pub fn configure_ntp_client(&mut self, ntp_ip: &str) -> Result<()> {
        self.command(cmds::tsc_role(1))?;
        self.command(cmds::tsc_tc_interface(0))?;
        let ip_hex = utils::ip_to_hex_ascii(ntp_ip)?;
        self.command(cmds::tsc_tc_srv_addr(&ip_hex))
    }

    /// Programs scan geometry and rate with the default echo filter.
    pub fn set_scan_config(&mut self, params: &LMSConfigParams) -> Result<()> {
        self.set_scan_config_with_echo_filter(params, DEFAULT_ECHO_FILTER)
    }

    /// Programs scan geometry and rate.
    ///
    /// Converts hertz to centihertz and sensor-frame radians to LMS wire
    /// milli-degrees, then issues `mLMPsetscancfg`, `LMDscandatacfg`,
    /// `FREchoFilter`, `LMPoutputRange` and `LMCstartmeas` in order,
    /// aborting on the first failing reply.
    pub fn set_scan_config_with_echo_filter(
        &mut self,
        params: &LMSConfigParams,
        echo_filter: u8,
    ) -> Result<()> {
        let freq_chz = (params.frequency * 100.0) as u32;
        let ang_incr_mdeg = (params.resolution * 10000.0).round() as u32;
        let start_mdeg = (utils::angle_to_lms(params.start_angle) * 10000.0).round() as i32;
        let end_mdeg = (utils::angle_to_lms(params.end_angle) * 10000.0).round() as i32;
        info!(
            "scan config: {} cHz, increment {}, window [{}, {}] mdeg",
            freq_chz, ang_incr_mdeg, start_mdeg, end_mdeg
        );

        self.command(cmds::set_scan_cfg(
            freq_chz,
            ang_incr_mdeg,
            start_mdeg,
            end_mdeg,
        ))?;
        self.command(cmds::scan_data_cfg())?;
        self.command(cmds::echo_filter(echo_filter))?;
        self.command(cmds::output_range(ang_incr_mdeg, start_mdeg, end_mdeg))?;
        self.command(cmds::start_meas())
    }

    /// `mEEwriteall`: persists the configuration to flash.
    pub fn save_params(&mut self) -> Result<()> {
        self.command(cmds::write_all())
    }

    /// Leaves configuration mode and subscribes to the scan stream.
    pub fn run(&mut self) -> Result<()> {
        self.command(cmds::run())?;
        self.command(cmds::scan_data(true))
    }

    /// Spawns the receiver thread and returns immediately.
    ///
    /// From here until [`stop`](LmsDevice::stop) the receiver owns the
    /// socket; configuration commands are refused.
    pub fn start_scan(&mut self) -> Result<()> {
        if self.state != DeviceState::Connected {
            return Err(Error::command_failure("device is streaming or closed"));
        }
        self.stop.store(false, Ordering::Relaxed);
        if let Ok(mut slot) = self.stream_error.lock() {
            *slot = None;
        }

        let mut channel = self.channel.try_clone()?;
        let stop = Arc::clone(&self.stop);
        let callback = Arc::clone(&self.callback);
        let stream_error = Arc::clone(&self.stream_error);
        self.poller = Some(std::thread::spawn(move || {
            receive_scans(&mut channel, &stop, &*callback, &stream_error);
        }));
        self.state = DeviceState::Streaming;
        Ok(())
    }

    /// The fatal streaming error recorded by the receiver thread, if any.
    pub fn take_stream_error(&mut self) -> Option<Error> {
        self.stream_error.lock().ok().and_then(|mut slot| slot.take())
    }

    /// Stops streaming and halts the measurement unit.
    ///
    /// Signals the receiver thread and joins it, unsubscribes with
    /// `LMDscandata 0`, drains unsolicited scan frames still in flight
    /// until the unsubscribe acknowledgement arrives, then re-authenticates
    /// and issues `LMCstopmeas`. Failures along the way are logged but
    /// never raised; `stop` always completes and closes the device.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.poller.take() {
            if handle.join().is_err() {
                error!("receiver thread panicked");
            }
        }
        if self.state == DeviceState::Streaming {
            self.state = DeviceState::Connected;
        }
        if self.state == DeviceState::Connected {
            if let Err(e) = self.shutdown_stream() {
                warn!("error while stopping measurement: {}", e);
            }
        }
        self.state = DeviceState::Closed;
    }

    /// The unsubscribe handshake: scan frames race the acknowledgement,
    /// so every frame that is not the `LMDscandata` reply is discarded.
    fn shutdown_stream(&mut self) -> Result<()> {
        // streaming may have used a short poll interval; the handshake
        // replies deserve the full reply timeout
        if let Err(e) = self
            .channel
            .set_recv_timeout(internals::DEFAULT_CHANNEL_TIMEOUT)
        {
            warn!("unable to restore receive timeout: {}", e);
        }
        self.channel.send(&cmds::scan_data(false))?;

        let mut pending: Vec<u8> = Vec::new();
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        loop {
            while let Some(frame) = take_frame(&mut pending) {
                if !mentions(&frame, b"LMDscandata") || reply_method(&frame) == Some("sSN") {
                    debug!("skipping trailing data ({} bytes)", frame.len());
                    continue;
                }
                classify_reply(&frame)?;
                // unsubscribe acknowledged; re-authenticate and halt the
                // measurement unit
                self.set_access_mode(DEFAULT_ACCESS_MODE, DEFAULT_CLIENT_PW_HASH)?;
                self.command(cmds::stop_meas())?;
                info!("measurement stopped");
                return Ok(());
            }
            let n = self.channel.recv(&mut buf)?;
            if n == 0 {
                return Err(Error::custom("connection closed while draining scan stream"));
            }
            pending.extend_from_slice(&buf[..n]);
        }
    }
}

impl Drop for LmsDevice {
    /// Joins a still-running receiver thread; does not talk to the
    /// sensor. Call [`stop`](LmsDevice::stop) for an orderly shutdown.
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.poller.take() {
            let _ = handle.join();
        }
    }
}

/// The receiver loop: owns the socket for the duration of streaming.
fn receive_scans(
    channel: &mut Channel,
    stop: &AtomicBool,
    callback: &ScanCallback,
    stream_error: &Mutex<Option<Error>>,
) {
    let mut buffer = vec![0u8; RECV_BUFFER_SIZE];
    let mut batcher = ScanBatcher::new();

    while !stop.load(Ordering::Relaxed) {
        let n = match channel.recv(&mut buffer) {
            Ok(0) => {
                warn!("sensor closed the connection");
                record_stream_error(stream_error, Error::custom("connection closed by sensor"));
                break;
            }
            Ok(n) => n,
            Err(Error::SocketRecv(ref e))
                if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock =>
            {
                // expected while the sensor briefly pauses between scans
                trace!("scan recv timed out");
                continue;
            }
            Err(e) => {
                warn!("scan recv: {}", e);
                continue;
            }
        };

        match batcher.push(&buffer[..n]) {
            Ok(Some(scan)) => callback(scan),
            Ok(None) => {}
            Err(e) => {
                error!("scan stream died: {}", e);
                record_stream_error(stream_error, e);
                break;
            }
        }
    }
}

fn record_stream_error(slot: &Mutex<Option<Error>>, error: Error) {
    if let Ok(mut slot) = slot.lock() {
        *slot = Some(error);
    }
}
