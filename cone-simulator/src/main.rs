mod render;
mod track;

use std::{
    fs,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::sleep,
    time::Duration,
};

use clap::Parser;
use od4::{GroundSteeringRequest, Od4Session, TimeStamp};
use opencv::prelude::*;
use rand::{rngs::StdRng, thread_rng, SeedableRng};
use render::Renderer;
use shared_frame::{shm_path, SharedFrameWriter};
use track::Track;
use vision::PipelineConfig;

/// Publishes synthetic cone frames and the matching ground steering.
#[derive(Parser)]
#[command(name = "cone-simulator", version)]
struct Cli {
    #[arg(long)]
    cid: u16,

    #[arg(long)]
    name: String,

    #[arg(long, default_value_t = 640)]
    width: u32,

    #[arg(long, default_value_t = 480)]
    height: u32,

    #[arg(long, default_value_t = 20)]
    fps: u32,

    /// Fixed seed for a reproducible track.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging();

    let renderer = Renderer::new(&PipelineConfig::default().homography, cli.width as i32, cli.height as i32)?;
    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(thread_rng())?,
    };
    let mut track = Track::new(rng);

    log::info!("Creating shared memory {}", cli.name);
    let mut writer = SharedFrameWriter::create(&cli.name, cli.width, cli.height)?;
    let od4 = Od4Session::new(cli.cid)?;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))?;
    }

    let frame_interval = Duration::from_secs(1) / cli.fps.max(1);
    log::info!("Starting main loop");
    while running.load(Ordering::SeqCst) {
        let view = track.next_view();
        let frame = renderer.render(&view)?;
        let timestamp = TimeStamp::now();

        // steering first so the consumer has it when the frame lands
        od4.send(&GroundSteeringRequest { ground_steering: view.ground_steering }, timestamp, 0)?;
        writer.publish(frame.data_bytes()?, timestamp.to_micros())?;
        log::debug!("Published frame at {} with ground steering {}", timestamp.to_micros(), view.ground_steering);

        sleep(frame_interval);
    }

    drop(writer);
    if let Err(e) = fs::remove_file(shm_path(&cli.name)) {
        log::warn!("Failed to remove shared memory {}: {e}", cli.name);
    }

    Ok(())
}

fn setup_logging() {
    simple_log::quick!();
}
