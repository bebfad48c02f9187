use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::Quat;
use shatter_common::{SimConfig, Transform};
use shatter_kernel::{ReadySignal, Scene, ScrambleTarget, ready_channel};
use shatter_mesh::{Mesh, TetIndexFile, unit_cube};
use shatter_physics::PhysicsWorld;
use shatter_render::{DebugTextRenderer, RenderView, Renderer};
use shatter_tetgen::{
    FixedFragmenter, Fragmenter, ProcessFragmenter, TetFileFragmenter, TetgenConfig,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shatter-cli", about = "CLI tool for shatter: fracture demo and tet file tooling")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Cut the unit cube, drop the fragments, print the final frame
    Demo {
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "60")]
        ticks: u64,
        /// Mass given to every fragment; defaults to the config value
        #[arg(short, long)]
        mass: Option<f32>,
        /// YAML simulation config
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Precomputed tet file instead of the built-in cube split
        #[arg(long, conflicts_with = "tool")]
        tet: Option<PathBuf>,
        /// External fragmentation tool to run instead of the built-in cube split
        #[arg(long)]
        tool: Option<PathBuf>,
        /// Arm the explosion after promoting
        #[arg(long)]
        explode: bool,
        /// Lay the fragments out on a circle before simulating
        #[arg(long)]
        scramble: bool,
        /// Tick on which physics becomes ready
        #[arg(long, default_value = "0")]
        ready_after: u64,
    },
    /// Parse a tet file and check its indices
    Validate {
        /// Tet index file
        tet: PathBuf,
        /// Vertex count of the mesh the file indexes
        #[arg(long)]
        vertices: usize,
    },
    /// Write the unit cube as a JSON mesh
    ExportMesh {
        /// Output path
        path: PathBuf,
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
            println!("shatter-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("mesh: {}", shatter_mesh::crate_info());
            println!("physics: {}", shatter_physics::crate_info());
            println!("tetgen: {}", shatter_tetgen::crate_info());
            println!("kernel: {}", shatter_kernel::crate_info());
            println!("render: {}", shatter_render::crate_info());
        }
        Commands::Demo {
            ticks,
            mass,
            config,
            tet,
            tool,
            explode,
            scramble,
            ready_after,
        } => {
            let config = match config {
                Some(path) => SimConfig::load(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => SimConfig::default(),
            };
            let mut fragmenter: Box<dyn Fragmenter> = match (tet, tool) {
                (Some(path), _) => Box::new(TetFileFragmenter::new(path)),
                (None, Some(program)) => Box::new(ProcessFragmenter::new(TetgenConfig {
                    program,
                    ..TetgenConfig::default()
                })),
                (None, None) => Box::new(FixedFragmenter::cube()),
            };
            run_demo(
                config,
                fragmenter.as_mut(),
                DemoOptions {
                    ticks,
                    mass,
                    explode,
                    scramble,
                    ready_after,
                },
            )?;
        }
        Commands::Validate { tet, vertices } => {
            let tets = TetIndexFile::read(&tet)
                .with_context(|| format!("reading {}", tet.display()))?;
            tets.check_bounds(vertices)?;
            println!("{}: {} tetrahedra, indices within {vertices} vertices", tet.display(), tets.len());
        }
        Commands::ExportMesh { path } => {
            let mesh = unit_cube();
            mesh.save(&path)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {} ({} vertices) to {}", mesh.name, mesh.positions.len(), path.display());
        }
    }

    Ok(())
}

struct DemoOptions {
    ticks: u64,
    mass: Option<f32>,
    explode: bool,
    scramble: bool,
    ready_after: u64,
}

fn run_demo(
    config: SimConfig,
    fragmenter: &mut dyn Fragmenter,
    opts: DemoOptions,
) -> anyhow::Result<()> {
    let dt = config.fixed_timestep;
    let mass = opts.mass.unwrap_or(config.dynamic_mass);
    let (signal, gate) = ready_channel();
    let mut signal = Some(signal);
    let mut scene = Scene::new(config.clone(), gate);

    let fire = |signal: &mut Option<ReadySignal>| {
        if let Some(signal) = signal.take() {
            let fired = signal.fire(PhysicsWorld::new(&config));
            tracing::info!(fired, "physics world handed over");
        }
    };
    if opts.ready_after == 0 {
        fire(&mut signal);
    }

    scene.load_whole(
        Mesh::new(unit_cube())?,
        Transform::from_rotation_scale(Quat::IDENTITY, 2.0),
    );
    let report = scene.cut(fragmenter)?;
    println!(
        "Cut: {} fragments ({} skipped)",
        report.fragments,
        report.skipped.len()
    );
    scene.promote_all_to_dynamic(mass)?;
    if opts.scramble {
        scene.scramble(ScrambleTarget::Active);
    }
    if opts.explode {
        let armed = scene.arm();
        println!("Armed: {} fragments, {} degenerate", armed.armed, armed.degenerate.len());
    }

    for tick in 1..=opts.ticks {
        if tick == opts.ready_after {
            fire(&mut signal);
        }
        scene.tick(dt);
    }

    let renderer = DebugTextRenderer::new().with_local();
    print!("{}", renderer.render(&scene.render_frame(), &RenderView::default()));
    let events = scene.drain_events();
    println!("Events: {}", events.len());
    Ok(())
}
