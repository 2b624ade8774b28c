use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use serde::Serialize;

use floating_calibration::calibration::{calibrate, CalibrationConfig, CalibrationOutput};
use floating_calibration::histogram::DanHistogram;
use floating_calibration::rerun_logger::RerunLogger;
use floating_calibration::session::{file_safe_id, is_session_file, load_session, write_json};
use floating_calibration::store::{HistogramStore, JsonFileStore};
use floating_calibration::summary::SessionSummary;

#[derive(Parser, Debug)]
#[command(name = "calibrate")]
#[command(about = "Floating calibration and DAN/DON road roughness for recorded drives", long_about = None)]
struct Args {
    /// Path to one session *.json[.gz]
    #[arg(long, conflicts_with = "session_dir")]
    session: Option<PathBuf>,

    /// Directory of session files, calibrated in parallel
    #[arg(long)]
    session_dir: Option<PathBuf>,

    /// JSON file with CalibrationConfig fields; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    alpha: Option<f64>,

    #[arg(long)]
    observer_alpha: Option<f64>,

    #[arg(long)]
    filter_alpha: Option<f64>,

    #[arg(long)]
    orientation_alpha: Option<f64>,

    #[arg(long)]
    dan_decay: Option<f64>,

    /// Output directory
    #[arg(long, default_value = "calibration_output")]
    out_dir: PathBuf,

    /// JSON key-value file holding the cross-session histogram
    #[arg(long)]
    store: Option<PathBuf>,

    /// Also write a Rerun .rrd per session
    #[arg(long, default_value_t = false)]
    rerun: bool,

    /// Worker threads for --session-dir
    #[arg(long, default_value = "4")]
    threads: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionReport<'a> {
    session_id: &'a str,
    generated_at: String,
    config: &'a CalibrationConfig,
    summary: &'a SessionSummary,
    /// Each segment's RoadDAN ranked against the stored histogram before this session.
    segment_percentiles: Vec<u32>,
    output: &'a CalibrationOutput,
}

struct Processed {
    session_id: String,
    report_path: PathBuf,
    summary: SessionSummary,
    histogram: DanHistogram,
}

fn ts_now_clean() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

fn load_config(args: &Args) -> Result<CalibrationConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => CalibrationConfig::default(),
    };
    if let Some(v) = args.alpha {
        config.alpha = v;
    }
    if let Some(v) = args.observer_alpha {
        config.observer_alpha = v;
    }
    if let Some(v) = args.filter_alpha {
        config.filter_alpha = v;
    }
    if let Some(v) = args.orientation_alpha {
        config.orientation_alpha = v;
    }
    if let Some(v) = args.dan_decay {
        config.dan_decay = v;
    }
    config.validate()?;
    Ok(config)
}

fn session_paths(args: &Args) -> Result<Vec<PathBuf>> {
    if let Some(dir) = args.session_dir.as_ref() {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if is_session_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        if paths.is_empty() {
            anyhow::bail!("No *.json or *.json.gz sessions in {}", dir.display());
        }
        Ok(paths)
    } else if let Some(session) = args.session.as_ref() {
        Ok(vec![session.clone()])
    } else {
        anyhow::bail!("Provide --session or --session-dir");
    }
}

fn run_session(path: &Path, config: &CalibrationConfig, prior: &DanHistogram, args: &Args) -> Result<Processed> {
    let session = load_session(path).with_context(|| format!("loading {}", path.display()))?;
    let session_id = session.id_or_stem(path);
    let output = calibrate(&session.input, config).with_context(|| format!("calibrating {}", session_id))?;
    let summary = SessionSummary::new(&session.input, &output, config.sample_rate_hz);

    let stamp = ts_now_clean();
    let file_id = file_safe_id(&session_id);
    let report_path = args.out_dir.join(format!("calibration_{}_{}.json", file_id, stamp));
    let report = SessionReport {
        session_id: &session_id,
        generated_at: Utc::now().to_rfc3339(),
        config,
        summary: &summary,
        segment_percentiles: prior.percentiles_for(&output.segments),
        output: &output,
    };
    write_json(&report_path, &report)?;

    if args.rerun {
        let rrd = args.out_dir.join(format!("rerun_{}_{}.rrd", file_id, stamp));
        RerunLogger::new(&rrd)?.log_session(&output, config.sample_rate_hz);
    }

    log::info!(
        "{}: {} samples, {} segments, confidence {:.2} -> {}",
        session_id,
        summary.samples,
        summary.segment_count,
        summary.final_confidence,
        report_path.display()
    );

    Ok(Processed {
        session_id,
        report_path,
        summary,
        histogram: output.session_histogram,
    })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let paths = session_paths(&args)?;
    fs::create_dir_all(&args.out_dir)?;

    let prior = match &args.store {
        Some(path) => HistogramStore::new(JsonFileStore::new(path)).load()?.histogram,
        None => DanHistogram::new(),
    };

    let threads = args.threads.max(1).min(paths.len());
    let chunk_size = (paths.len() + threads - 1) / threads;
    log::info!("calibrating {} session(s) on {} thread(s)", paths.len(), threads);

    let (config_ref, prior_ref, args_ref) = (&config, &prior, &args);
    let outcomes = crossbeam::scope(|s| -> Result<Vec<(PathBuf, Result<Processed>)>> {
        let handles: Vec<_> = paths
            .chunks(chunk_size)
            .map(|chunk| {
                s.spawn(move |_| {
                    chunk
                        .iter()
                        .map(|p| (p.clone(), run_session(p, config_ref, prior_ref, args_ref)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut all = Vec::with_capacity(paths.len());
        for handle in handles {
            all.extend(handle.join().map_err(|_| anyhow::anyhow!("calibration worker panicked"))?);
        }
        Ok(all)
    })
    .map_err(|_| anyhow::anyhow!("calibration worker panicked"))??;

    let mut store = args.store.as_ref().map(|p| HistogramStore::new(JsonFileStore::new(p)));
    let mut results = Vec::new();
    let mut failures = 0;
    for (path, outcome) in outcomes {
        match outcome {
            Ok(processed) => {
                if let Some(store) = store.as_mut() {
                    store.merge_session(&processed.session_id, &processed.histogram)?;
                }
                results.push(serde_json::json!({
                    "sessionId": processed.session_id,
                    "report": processed.report_path,
                    "summary": processed.summary,
                }));
            }
            Err(e) => {
                failures += 1;
                log::error!("Failed {}: {:#}", path.display(), e);
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&results)?);
    if results.is_empty() && failures > 0 {
        anyhow::bail!("all {} session(s) failed", failures);
    }
    Ok(())
}
