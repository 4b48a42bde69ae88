//! Minimal capture runner: brings up a scan stream and reports the rate.
//!
//! ```text
//! lms_capture <sensor-ip> [--port N] [--ntp IP] [--freq HZ] [--res DEG]
//!             [--start DEG] [--end DEG] [--echo N] [--mode N]
//!             [--hash HEX] [--save]
//! ```

use sick_lms::{
    LMSConfigParams, LmsDevice, DEFAULT_ACCESS_MODE, DEFAULT_CLIENT_PW_HASH, DEFAULT_ECHO_FILTER,
    DEFAULT_SOPAS_PORT,
};
use std::env;
use std::process::exit;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

struct Options {
    sensor_ip: String,
    port: u16,
    ntp_ip: Option<String>,
    frequency: f64,
    resolution: f64,
    start_angle_deg: f64,
    end_angle_deg: f64,
    echo_filter: u8,
    access_mode: u8,
    pw_hash: u32,
    save: bool,
}

fn usage() -> ! {
    eprintln!(
        "usage: lms_capture <sensor-ip> [--port N] [--ntp IP] [--freq HZ] \
         [--res DEG] [--start DEG] [--end DEG] [--echo N] [--mode N] \
         [--hash HEX] [--save]"
    );
    exit(1);
}

fn parse_options() -> Options {
    let mut options = Options {
        sensor_ip: String::new(),
        port: DEFAULT_SOPAS_PORT,
        ntp_ip: None,
        frequency: 25.0,
        resolution: 0.1667,
        start_angle_deg: -95.0,
        end_angle_deg: 95.0,
        echo_filter: DEFAULT_ECHO_FILTER,
        access_mode: DEFAULT_ACCESS_MODE,
        pw_hash: DEFAULT_CLIENT_PW_HASH,
        save: false,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--port" => match args.next().and_then(|v| v.parse().ok()) {
                Some(port) => options.port = port,
                None => usage(),
            },
            "--ntp" => match args.next() {
                Some(ip) => options.ntp_ip = Some(ip),
                None => usage(),
            },
            "--freq" => match args.next().and_then(|v| v.parse().ok()) {
                Some(freq) => options.frequency = freq,
                None => usage(),
            },
            "--res" => match args.next().and_then(|v| v.parse().ok()) {
                Some(res) => options.resolution = res,
                None => usage(),
            },
            "--start" => match args.next().and_then(|v| v.parse().ok()) {
                Some(deg) => options.start_angle_deg = deg,
                None => usage(),
            },
            "--end" => match args.next().and_then(|v| v.parse().ok()) {
                Some(deg) => options.end_angle_deg = deg,
                None => usage(),
            },
            "--echo" => match args.next().and_then(|v| v.parse().ok()) {
                Some(mode) => options.echo_filter = mode,
                None => usage(),
            },
            "--mode" => match args.next().and_then(|v| v.parse().ok()) {
                Some(mode) => options.access_mode = mode,
                None => usage(),
            },
            "--hash" => match args
                .next()
                .and_then(|v| u32::from_str_radix(v.trim_start_matches("0x"), 16).ok())
            {
                Some(hash) => options.pw_hash = hash,
                None => usage(),
            },
            "--save" => options.save = true,
            _ if options.sensor_ip.is_empty() && !arg.starts_with("--") => {
                options.sensor_ip = arg;
            }
            _ => usage(),
        }
    }
    if options.sensor_ip.is_empty() {
        usage();
    }
    options
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let options = parse_options();

    let n_scans = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&n_scans);
    let mut device = match LmsDevice::connect(&options.sensor_ip, options.port, move |_scan| {
        counter.fetch_add(1, Ordering::Relaxed);
    }) {
        Ok(device) => device,
        Err(e) => {
            log::error!("could not connect to sensor: {}", e);
            exit(1);
        }
    };

    if let Err(e) = device.set_access_mode(options.access_mode, options.pw_hash) {
        log::error!("could not set access mode: {}", e);
        exit(1);
    }
    if let Some(ntp_ip) = &options.ntp_ip {
        if let Err(e) = device.configure_ntp_client(ntp_ip) {
            log::error!("could not configure ntp client: {}", e);
            exit(2);
        }
    }

    let params = LMSConfigParams {
        frequency: options.frequency,
        resolution: options.resolution,
        start_angle: options.start_angle_deg.to_radians(),
        end_angle: options.end_angle_deg.to_radians(),
    };
    if let Err(e) = device.set_scan_config_with_echo_filter(&params, options.echo_filter) {
        log::error!("could not configure scan: {}", e);
        exit(3);
    }
    if options.save {
        if let Err(e) = device.save_params() {
            log::error!("could not save params: {}", e);
            exit(4);
        }
    }
    if let Err(e) = device.run() {
        log::error!("could not run scanner: {}", e);
        exit(5);
    }

    if let Err(e) = device.start_scan() {
        log::error!("could not start receiver: {}", e);
        exit(5);
    }

    log::info!("waiting for the scanner to settle...");
    thread::sleep(Duration::from_secs(2));
    n_scans.store(0, Ordering::Relaxed);
    let tic = Instant::now();
    thread::sleep(Duration::from_secs(4));
    let elapsed = tic.elapsed().as_secs_f64();
    let count = n_scans.load(Ordering::Relaxed);
    log::info!(
        "got {} scans in {:.2}s ({:.1} Hz)",
        count,
        elapsed,
        count as f64 / elapsed
    );

    device.stop();
}
