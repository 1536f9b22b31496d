mod accuracy;
mod ground_truth;
mod timing;

use std::{
    path::PathBuf,
    process::ExitCode,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use accuracy::{AccuracyTally, Tolerances};
use clap::Parser;
use ground_truth::GroundTruth;
use od4::{DataType, GroundSteeringRequest, Od4Session};
use opencv::{
    core::Mat,
    highgui::{imshow, wait_key},
};
use shared_frame::{Frame, SharedFrame};
use timing::FrameTimer;
use vision::{argb_to_mat, FrameResult, PipelineConfig, VisionSystem};

/// Steers between yellow and blue cones seen in shared memory frames.
#[derive(Parser)]
#[command(name = "cone-steering", version)]
struct Cli {
    /// OD4 conference id to receive ground steering on.
    #[arg(long)]
    cid: u16,

    /// Name of the shared memory area holding the ARGB frames.
    #[arg(long)]
    name: String,

    #[arg(long)]
    width: u32,

    #[arg(long)]
    height: u32,

    /// Show the frame and bird's-eye view, log per-frame detail.
    #[arg(long)]
    verbose: bool,

    /// TOML file overriding the default calibration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tag printed in front of every result line.
    #[arg(long, default_value = "group_10")]
    group: String,

    /// Log the accuracy against ground steering on shutdown.
    #[arg(long)]
    tally: bool,

    /// Absolute tolerance for frames where ground steering is zero.
    #[arg(long, default_value_t = 0.0)]
    straight_tolerance: f64,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
        }
    };
    setup_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    let vision = VisionSystem::new(config)?;

    log::info!("Attaching to shared memory {}", cli.name);
    let mut shared = SharedFrame::attach(&cli.name, cli.width, cli.height)?;
    log::info!("Attached to {} ({} bytes)", shared.path().display(), shared.size());

    let ground_truth = GroundTruth::default();
    let mut od4 = Od4Session::new(cli.cid)?;
    {
        let ground_truth = ground_truth.clone();
        od4.data_trigger(GroundSteeringRequest::ID, move |envelope| {
            match envelope.unpack::<GroundSteeringRequest>() {
                Ok(request) => ground_truth.store(request.ground_steering),
                Err(e) => log::debug!("Ignoring ground steering request: {e}"),
            }
        })?;
    }

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))?;
    }

    let mut tally = AccuracyTally::new(Tolerances { straight: cli.straight_tolerance, ..Default::default() });
    let mut timer = FrameTimer::default();

    log::info!("Starting main loop");
    while shared.wait(|| running.load(Ordering::SeqCst) && od4.is_running()) {
        let frame = match shared.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("Skipping frame: {e:#}");
                continue;
            }
        };
        let truth = ground_truth.load();

        let started = Instant::now();
        let steering = steer(&vision, &frame, cli.verbose);
        timer.record(started.elapsed());

        let classification = tally.record(steering, truth as f64);
        log::debug!(
            "Ground steering {truth}, {classification:?}, {} ({} us per frame)",
            tally.report(),
            timer.average_micros()
        );

        println!("{}", result_line(&cli.group, frame.timestamp_micros, steering));
    }

    log::info!("Stopped after {} frames, {} us per frame on average", tally.frames(), timer.average_micros());
    if cli.tally {
        log::info!("Accuracy: {}", tally.report());
    }

    Ok(())
}

/// Steering for one frame. A frame that cannot be processed drives straight;
/// a failed display leaves the steering alone.
fn steer(vision: &VisionSystem, frame: &Frame, verbose: bool) -> f64 {
    let (img, result) = match process(vision, frame) {
        Ok(processed) => processed,
        Err(e) => {
            log::warn!("Frame {} failed, driving straight: {e:#}", frame.timestamp_micros);
            return 0.0;
        }
    };

    if verbose {
        if let Err(e) = show(vision, &img, &result) {
            log::warn!("Failed to display frame {}: {e:#}", frame.timestamp_micros);
        }
    }

    result.steering
}

fn process(vision: &VisionSystem, frame: &Frame) -> anyhow::Result<(Mat, FrameResult)> {
    let img = argb_to_mat(&frame.data, frame.width as i32, frame.height as i32)?;
    let result = vision.process_frame(&img)?;

    Ok((img, result))
}

fn result_line(group: &str, timestamp_micros: i64, steering: f64) -> String {
    format!("{group};{timestamp_micros};{steering}")
}

fn show(vision: &VisionSystem, img: &Mat, result: &FrameResult) -> anyhow::Result<()> {
    let view = vision.birds_eye_view(img, result)?;
    imshow("frame", img)?;
    imshow("birds eye view", &view)?;
    wait_key(1)?;

    Ok(())
}

fn setup_logging(verbose: bool) {
    if verbose {
        simple_log::quick!("debug");
    } else {
        simple_log::quick!("info");
    }
}
