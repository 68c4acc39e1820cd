//! # Frame Demo
//!
//! Runs a deferred renderer's frames through the frame graph on the dummy
//! backend and logs what every frame executed.
//!
//! ```bash
//! cargo run -p framegraph-demos --bin frame_demo -- --frames 8 --threads 4
//! RUST_LOG=debug cargo run -p framegraph-demos --bin frame_demo -- --dump-plan
//! ```

use clap::Parser;

use framegraph::{DummyBackend, FrameGraph, FrameGraphConfig};
use framegraph_demos::{DemoRenderer, RenderSettings};

/// Frame graph demo arguments.
#[derive(Parser, Debug)]
#[command(
    name = "Frame Demo",
    about = "Runs a deferred renderer's frames through the frame graph"
)]
struct Args {
    /// Number of frames to render.
    #[arg(long, default_value_t = 6)]
    frames: u64,

    /// Maximum recording threads (default: available cores, up to 8).
    #[arg(long)]
    threads: Option<usize>,

    /// Disable temporal anti-aliasing.
    #[arg(long)]
    no_taa: bool,

    /// Frames rendered before TAA starts.
    #[arg(long, default_value_t = 2)]
    warmup_frames: u64,

    /// Frames spent building the TLAS.
    #[arg(long, default_value_t = 1)]
    tlas_build_frames: u64,

    /// Log the execution plan of every frame at debug level.
    #[arg(long)]
    dump_plan: bool,

    /// Print the last frame's execution order as Graphviz DOT.
    #[arg(long)]
    dot: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    framegraph::init();

    let args = Args::parse();

    let mut config = FrameGraphConfig::new().with_execution_plan_dump(args.dump_plan);
    if let Some(threads) = args.threads {
        config = config.with_max_recording_threads(threads);
    }

    let backend = DummyBackend::new();
    let mut graph = FrameGraph::new(config);
    let mut renderer = DemoRenderer::new(
        &backend,
        RenderSettings {
            taa: !args.no_taa,
            warmup_frames: args.warmup_frames,
            tlas_build_frames: args.tlas_build_frames,
            capture_dot: args.dot,
        },
    );

    let mut last_dot = None;
    for _ in 0..args.frames {
        let output = match renderer.render_frame(&mut graph, &backend) {
            Ok(output) => output,
            Err(err) => {
                log::error!("Frame {} failed: {err}", graph.frame_index());
                std::process::exit(1);
            }
        };

        let report = output.report;
        log::info!(
            "Frame {}: {} passes [{}], {} transitions, {} UAV barriers, {} contexts on {} threads",
            report.frame_index,
            report.pass_count,
            output.passes.join(" -> "),
            report.transition_barriers,
            report.uav_barriers,
            report.contexts_submitted,
            report.recording_threads
        );
        last_dot = output.dot;
    }

    log::info!(
        "Rendered {} frames, {} command contexts created",
        args.frames,
        backend.contexts_created()
    );
    if let Some(dot) = last_dot {
        println!("{dot}");
    }
}
