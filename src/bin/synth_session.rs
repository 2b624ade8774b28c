//! Write a deterministic synthetic drive as a session file.
//!
//! Handy for exercising `calibrate` without a phone recording.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use floating_calibration::session::{save_session, SessionFile};
use floating_calibration::synthetic::DriveScenario;

#[derive(Parser, Debug)]
struct Args {
    /// Output path (*.json or *.json.gz)
    #[arg(long, default_value = "synthetic_session.json.gz")]
    out: PathBuf,

    #[arg(long, default_value = "synthetic")]
    session_id: String,

    /// Parked samples before pulling away
    #[arg(long, default_value = "300")]
    rest_samples: usize,

    #[arg(long, default_value = "300")]
    accel_samples: usize,

    /// Forward acceleration during the pull-away, m/s²
    #[arg(long, default_value = "3.0")]
    accel: f64,

    #[arg(long, default_value = "0.05")]
    noise: f64,

    #[arg(long, default_value_t = false)]
    no_gps: bool,

    #[arg(long, default_value_t = false)]
    no_mag: bool,

    #[arg(long, default_value = "1")]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if !args.accel.is_finite() || !args.noise.is_finite() || args.noise < 0.0 {
        anyhow::bail!("--accel must be finite and --noise finite and non-negative");
    }

    let scenario = DriveScenario {
        rest_samples: args.rest_samples,
        accel_samples: args.accel_samples,
        accel_mps2: args.accel,
        accel_noise: args.noise,
        include_gps: !args.no_gps,
        include_mag: !args.no_mag,
        seed: args.seed,
        ..DriveScenario::default()
    };
    let input = scenario.generate();
    log::info!(
        "generated {} samples, {} gps fixes -> {}",
        input.len(),
        input.gps.len(),
        args.out.display()
    );
    save_session(&args.out, &SessionFile::new(args.session_id, input))?;
    Ok(())
}
