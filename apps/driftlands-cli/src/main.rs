mod sim;

use std::ops::ControlFlow;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use driftlands_backdrop::{MaskCache, NebulaBaker};
use driftlands_client::{Client, ClientConfig, FixedRefresh, Frame, FrameLoop};
use driftlands_input::PointerEvent;
use driftlands_render::{DebugTextRenderer, ImageInfo, Renderer};
use driftlands_stream::WorldMeta;
use glam::Vec2;
use tracing_subscriber::EnvFilter;

use crate::sim::{CATALOG, ChunkServer, EntityServer, IslandWorld};

#[derive(Parser)]
#[command(name = "driftlands-cli", about = "Headless driver for the driftlands client core")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate versions
    Info,
    /// Run the frame loop against an in-process world and server
    Simulate {
        /// Number of frames to run
        #[arg(short, long, default_value = "600")]
        frames: u64,
        /// World seed
        #[arg(short, long, default_value = "42")]
        seed: u64,
        /// Simulated remote entities
        #[arg(short, long, default_value = "8")]
        bots: usize,
        /// YAML client config
        #[arg(long)]
        config: Option<PathBuf>,
        /// Chunk fetch latency in milliseconds
        #[arg(long, default_value = "120")]
        latency_ms: f64,
        /// Fraction of chunk fetches that fail
        #[arg(long, default_value = "0.05")]
        fail_rate: f64,
        /// Print the debug rendering of the last frame
        #[arg(long)]
        render: bool,
    },
    /// Bake one nebula cloud to a PNG
    BakeNebula {
        /// Cloud seed
        #[arg(short, long, default_value = "42")]
        seed: u64,
        /// Output file
        #[arg(short, long, default_value = "nebula.png")]
        out: PathBuf,
        /// YAML client config supplying the nebula section
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("driftlands-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", driftlands_common::crate_info());
            println!("stream: {}", driftlands_stream::crate_info());
            println!("terrain: {}", driftlands_terrain::crate_info());
            println!("backdrop: {}", driftlands_backdrop::crate_info());
            println!("replica: {}", driftlands_replica::crate_info());
            println!("render: {}", driftlands_render::crate_info());
            println!("input: {}", driftlands_input::crate_info());
            println!("client: {}", driftlands_client::crate_info());
        }
        Commands::Simulate {
            frames,
            seed,
            bots,
            config,
            latency_ms,
            fail_rate,
            render,
        } => {
            let mut config = load_config(config.as_ref())?;
            config.seed = seed;
            simulate(config, frames, bots, latency_ms, fail_rate, render)?;
        }
        Commands::BakeNebula { seed, out, config } => {
            let config = load_config(config.as_ref())?;
            let baker = NebulaBaker::new(config.backdrop.nebula)?;
            let mut masks = MaskCache::unbounded();
            let bake = baker.bake(seed, &mut masks)?;
            bake.save_png(&out)
                .with_context(|| format!("writing {}", out.display()))?;
            println!(
                "Baked {} ({}x{}) to {}",
                bake.key,
                bake.image.width(),
                bake.image.height(),
                out.display()
            );
        }
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ClientConfig> {
    match path {
        Some(path) => ClientConfig::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(ClientConfig::default()),
    }
}

fn simulate(
    config: ClientConfig,
    frames: u64,
    bots: usize,
    latency_ms: f64,
    fail_rate: f64,
    render: bool,
) -> anyhow::Result<()> {
    let seed = config.seed;
    let max_dt = config.frame.max_dt;
    let meta = WorldMeta::for_tiles(256, 256, 32);
    let world = IslandWorld::new(meta, seed);
    let mut client = Client::new(meta, config)?;
    client.use_threaded_nebula();
    client.resize(Vec2::new(1280.0, 720.0));
    let defs = client.load_object_catalog(CATALOG)?;

    let spawn = Vec2::new(meta.width_tiles as f32, meta.height_tiles as f32) * 16.0;
    let mut chunks = ChunkServer::new(world, seed, latency_ms, fail_rate);
    let mut server = EntityServer::new(seed, bots, spawn);
    tracing::info!(frames, seed, bots, defs, "starting simulation");
    println!("Simulating {frames} frames: seed={seed}, bots={bots}, object defs={defs}");

    let mut frame_loop = FrameLoop::new(FixedRefresh::new(1000.0 / 60.0).limit(frames), max_dt);
    let mut last: Option<Frame> = None;
    let mut ready_at = None;
    frame_loop.run(|tick| {
        let now = tick.now_ms;
        for msg in server.poll(now) {
            // malformed frames are counted by the replica
            let _ = client.apply_server_text(&msg, now);
        }
        for (coord, result) in chunks.poll(now) {
            let _ = client.complete_chunk(coord, result);
        }

        // scripted drag toward the lower right, held for two seconds
        if tick.frame_index == 30 {
            let screen = client.viewport().size * Vec2::new(0.75, 0.7);
            if let Some(intent) = client.pointer(PointerEvent::Down(screen), now) {
                server.move_intent(intent);
            }
        } else if tick.frame_index == 150 {
            client.pointer(PointerEvent::Up, now);
        }

        let frame = client.frame(tick);
        for &coord in &frame.chunk_requests {
            chunks.request(coord, now);
        }
        for key in &frame.image_requests {
            client.complete_image(key, Ok(ImageInfo { width: 32, height: 32 }));
        }
        for intent in &frame.intents {
            server.move_intent(*intent);
        }
        if ready_at.is_none() && client.boot().ready() {
            ready_at = Some(tick.frame_index);
        }
        last = Some(frame);
        ControlFlow::Continue(())
    });

    let boot = client.boot();
    let (done, total) = boot.progress();
    println!(
        "Boot: {done}/{total} steps done, ready={}, errors={}",
        boot.ready(),
        boot.has_error()
    );
    for (step, status) in boot.steps() {
        println!("  {step}: {status}");
    }
    if let Some(frame) = ready_at {
        println!("  ready at frame {frame}");
    }

    let stream = client.store().stats();
    println!(
        "Stream: cached={}, in_flight={}, requested={}, loaded={}, failed={}, evicted={}, version={}",
        stream.cached_chunks,
        stream.in_flight,
        stream.requested_total,
        stream.loaded_total,
        stream.failed_total,
        stream.evicted_total,
        client.store().version()
    );
    println!(
        "Servers: chunks served={}, chunks failed={}, messages sent={}",
        chunks.served, chunks.failed, server.sent
    );

    let replica = client.replica().stats();
    println!(
        "Replica: messages={}, malformed={}, stale={}, remote={}, objects={}",
        replica.messages,
        replica.malformed,
        replica.stale_samples,
        client.replica().interpolator().len(),
        client.replica().objects().len()
    );
    println!(
        "Player: server=({:.1}, {:.1}) camera=({:.1}, {:.1})",
        server.player().x,
        server.player().y,
        client.camera().smoothed.x,
        client.camera().smoothed.y
    );

    let stats = client.stats();
    println!(
        "Frames: {} at {:.1} fps, work avg {:.3} ms, min {:.3} ms, max {:.3} ms ({:.1}% of interval)",
        stats.frames(),
        stats.fps(),
        stats.average_work().as_secs_f64() * 1000.0,
        stats.min_work().as_secs_f64() * 1000.0,
        stats.max_work().as_secs_f64() * 1000.0,
        stats.load() * 100.0
    );

    if let Some(frame) = last {
        println!(
            "Last frame: {} commands, {} tiles ({} placeholders), {} sprites drawn, {} culled, {} skipped",
            frame.draw.len(),
            frame.terrain.tiles,
            frame.terrain.placeholders,
            frame.sprites.drawn,
            frame.sprites.culled,
            frame.sprites.skipped
        );
        if render {
            let mut renderer = DebugTextRenderer::new();
            print!("{}", renderer.render(&frame.draw, &frame.context.viewport));
        }
    }

    Ok(())
}
