//! satctl: Doppler-corrected radio and rotator control from the command line.
//!
//! Geometry comes from a fixed range-rate or a synthetic demo pass; a real
//! orbit propagator plugs in through the `Tracker` port.

use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use clap::Parser;
use crossbeam_channel::RecvTimeoutError;

use satctl_lib::adapters::{StaticTracker, SyntheticPass};
use satctl_lib::domain::{SatctlError, SatctlResult};
use satctl_lib::ports::Tracker;
use satctl_lib::state::StationState;
use satctl_lib::worker::{ControlCommand, RadioCommand, RotatorCommand, StationStatus};

#[derive(Parser)]
#[command(
    name = "satctl",
    version,
    about = "Doppler-corrected radio and antenna rotator control for satellite passes"
)]
struct Cli {
    /// Station profile (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Target range-rate in km/s, positive when receding
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    range_rate: f64,

    /// Fly a synthetic pass instead of a fixed range-rate
    #[arg(long)]
    demo_pass: bool,

    /// Downlink sky frequency in Hz
    #[arg(long)]
    downlink: Option<f64>,

    /// Uplink sky frequency in Hz
    #[arg(long)]
    uplink: Option<f64>,

    /// Tune to a transponder from the profile
    #[arg(long)]
    transponder: Option<String>,

    /// Lock uplink and downlink through the transponder
    #[arg(long, requires = "transponder")]
    lock: bool,

    /// Apply LO offsets only, no Doppler correction
    #[arg(long)]
    no_tracking: bool,

    /// Override the profile's cycle period (ms)
    #[arg(long)]
    period_ms: Option<u64>,

    /// Use in-memory radio/rotator instead of rigctld/rotctld
    #[arg(long)]
    mock: bool,

    /// Stop after this many seconds (runs until killed otherwise)
    #[arg(long)]
    duration: Option<f64>,
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("satctl_lib=info,satctl=info"),
    )
    .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> SatctlResult<()> {
    let state = StationState::load(&cli.config)?;

    let tracker: Box<dyn Tracker> = if cli.demo_pass {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Box::new(SyntheticPass::starting_at(now))
    } else {
        Box::new(StaticTracker::with_range_rate(cli.range_rate))
    };

    let links = if cli.mock {
        state.mock_links()
    } else {
        state.daemon_links()
    };
    let deadline = deadline(cli.duration, Instant::now())?;
    let mut worker = state.start(links, tracker)?;

    if let Some(ms) = cli.period_ms {
        worker.send(ControlCommand::SetPeriod(ms))?;
    }
    if cli.no_tracking {
        worker.radio(RadioCommand::SetTracking(false))?;
    }
    if let Some(name) = &cli.transponder {
        let trsp = state
            .transponder(name)
            .ok_or_else(|| SatctlError::Config(format!("No transponder named '{name}'")))?;
        worker.radio(RadioCommand::SelectTransponder(Some(trsp)))?;
        if cli.lock {
            worker.radio(RadioCommand::SetTransponderLock(true))?;
        }
    }
    if let Some(hz) = cli.downlink {
        worker.radio(RadioCommand::SetDownlink(hz))?;
    }
    if let Some(hz) = cli.uplink {
        worker.radio(RadioCommand::SetUplink(hz))?;
    }

    worker.radio(RadioCommand::Engage)?;
    if state.rotator.is_some() {
        worker.rotator(RotatorCommand::SetTracking(!cli.no_tracking))?;
        worker.rotator(RotatorCommand::Engage)?;
    }

    loop {
        let wait = match deadline {
            Some(d) => match d.checked_duration_since(Instant::now()) {
                Some(left) => left,
                None => break,
            },
            None => Duration::from_secs(3600),
        };
        match worker.status().recv_timeout(wait) {
            Ok(status) => print_status(&status),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                return Err(SatctlError::Worker("Control thread exited".into()))
            }
        }
    }

    worker.shutdown()
}

/// When to stop for `--duration secs`. A deadline too far out to
/// represent means running until killed.
fn deadline(secs: Option<f64>, now: Instant) -> SatctlResult<Option<Instant>> {
    let Some(secs) = secs else {
        return Ok(None);
    };
    let span = Duration::try_from_secs_f64(secs.max(0.0))
        .map_err(|e| SatctlError::Config(format!("Invalid duration {secs}: {e}")))?;
    Ok(now.checked_add(span))
}

fn print_status(s: &StationStatus) {
    let r = &s.radio;
    print!(
        "{:.1}  down {:.0} → {:.0} ({:+.1} Hz)  up {:.0} → {:.0} ({:+.1} Hz)  {}{}errors={}",
        s.time,
        r.downlink.sat_freq,
        r.downlink.radio_freq,
        r.downlink.doppler_shift_hz,
        r.uplink.sat_freq,
        r.uplink.radio_freq,
        r.uplink.doppler_shift_hz,
        if r.engaged { "engaged " } else { "idle " },
        if r.ptt { "TX " } else { "" },
        r.error_count,
    );
    if let Some(rot) = &s.rotator {
        print!(
            "  rot set {:.1}/{:.1}",
            rot.set_point.az, rot.set_point.el
        );
        if let Some(pos) = rot.position {
            print!(" at {:.1}/{:.1}", pos.az, pos.el);
        }
    }
    println!();
}
