mod accel;
mod config;
mod driver;
mod emit;
mod mouse;
mod report;
mod settings;
mod virtual_mouse;

use accel::Accelerator;
use clap::Parser;
use config::Config;
use driver::{CancelToken, Driver};
use hidapi::HidApi;
use mouse::{find_mouse, EvdevGrab, MouseReader};
use settings::Settings;
use std::io;
use virtual_mouse::VirtualMouse;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = Config::parse();
    std::process::exit(run(&config));
}

fn run(config: &Config) -> i32 {
    let mut settings = Settings::default();
    match &config.settings {
        Some(path) => {
            log::info!("Loading settings from {}", path.display());
            if let Err(e) = config::load_settings(&mut settings, path) {
                log::error!("Failed to load settings: {}", e);
                return e.exit_code();
            }
        }
        None => log::info!("No settings file given, using defaults"),
    }

    if config.print_curve {
        println!("velocity\tsensitivity");
        for (velocity, sens) in accel::curve_points(&settings) {
            println!("{:.1}\t{:.4}", velocity, sens);
        }
        return 0;
    }

    println!("hidaccel - USB mouse acceleration");
    settings.log_summary();
    println!();

    let cancel = CancelToken::new();
    if let Err(e) = spawn_signal_watcher(cancel.clone()) {
        log::error!("Failed to set up signal handling: {}", e);
        return e.raw_os_error().unwrap_or(1);
    }

    let api = match HidApi::new() {
        Ok(api) => api,
        Err(e) => {
            log::error!("Failed to initialise hidapi: {}", e);
            return 1;
        }
    };

    let Some(info) = find_mouse(&api, config.device) else {
        log::warn!("No USB mouse found. Do you have access to /dev/hidraw*?");
        return 0;
    };

    let reader = match MouseReader::open(&api, &info) {
        Ok(r) => r,
        Err(e) => {
            log::error!("Failed to open mouse: {}", e);
            log::error!("Check permissions on /dev/hidraw* (try running with sudo)");
            return e.exit_code();
        }
    };

    // Keep the kernel's own mouse events away from the desktop while we run.
    let grab = if config.no_grab {
        None
    } else {
        match EvdevGrab::grab(info.id) {
            Ok(Some(g)) => Some(g),
            Ok(None) => {
                log::warn!("No evdev node found for {}, not grabbing", info.id);
                None
            }
            Err(e) => {
                log::error!("Failed to grab mouse: {}", e);
                return e.exit_code();
            }
        }
    };

    let sink = match VirtualMouse::new(info.id) {
        Ok(s) => s,
        Err(e) => {
            log::error!("Failed to create virtual mouse: {}", e);
            log::error!("Do you have /dev/uinput access? Try: sudo modprobe uinput");
            return e.raw_os_error().unwrap_or(1);
        }
    };

    let accel = if config.precompute {
        Accelerator::precomputed(settings)
    } else {
        Accelerator::new(settings)
    };
    let mut driver = Driver::new(reader, sink, accel, config.report_size);

    println!("Stop with Ctrl-C.");
    println!();

    let code = match driver.run(&cancel) {
        Ok(()) => 0,
        Err(e) => {
            log::error!("Driver stopped: {}", e);
            e.exit_code()
        }
    };

    log::info!("Shutting down...");
    drop(driver);
    drop(grab);
    log::info!("Done");
    code
}

/// Block SIGINT/SIGTERM for the process and wait for them on a dedicated
/// thread, which cancels `cancel`. Must run before any other thread exists.
fn spawn_signal_watcher(cancel: CancelToken) -> io::Result<()> {
    let mut set: libc::sigset_t = unsafe { std::mem::zeroed() };
    let ret = unsafe {
        libc::sigemptyset(&mut set);
        libc::sigaddset(&mut set, libc::SIGINT);
        libc::sigaddset(&mut set, libc::SIGTERM);
        libc::pthread_sigmask(libc::SIG_BLOCK, &set, std::ptr::null_mut())
    };
    if ret != 0 {
        return Err(io::Error::from_raw_os_error(ret));
    }

    std::thread::Builder::new()
        .name("signal-watcher".into())
        .spawn(move || {
            let mut sig: libc::c_int = 0;
            if unsafe { libc::sigwait(&set, &mut sig) } == 0 {
                log::info!("Received signal {}, stopping", sig);
            }
            cancel.cancel();
        })?;
    Ok(())
}
