//! Wavefront CLI - render built-in scenes with the tiled wavefront path tracer.

mod export;
mod scenes;

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use wavefront::prelude::*;

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut verbosity = 1u8;
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => verbosity = 2,
            "-vv" | "--trace" => verbosity = 3,
            "-q" | "--quiet" => verbosity = 0,
            _ => filtered_args.push(arg),
        }
    }

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let _trace_guard = init_tracing(verbosity);

    let result = match filtered_args[0] {
        "render" | "r" => cmd_render(&filtered_args[1..]),
        "tiles" | "t" => cmd_tiles(&filtered_args[1..]),
        "config" | "c" => cmd_config(&filtered_args[1..]),
        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_help();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_help() {
    println!(
        "wavefront - tiled wavefront path tracer

USAGE:
    wavefront [-v|-vv|-q] <command> [options]

COMMANDS:
    render, r    Render a built-in scene
    tiles, t     Print the tile plan for a configuration
    config, c    Print the default configuration as JSON [or write it to <file>]
    help, h      Show this help

RENDER / TILES OPTIONS:
    --config <file.json>      Load settings from JSON
    --scene <name>            {scenes} (default: cornell)
    --width <W> --height <H>  Image resolution
    --samples <N>             Samples per pixel
    --queues <N>              Execution queues (0 = one per hardware thread)
    --states <N>              Path states per queue
    --seed <N>                Sampling seed
    --max-bounce <N>          Scatter events after the camera hit
    --fail-fast               Stop all queues on the first device failure
    -o, --output <file>       Output image (.hdr, .exr, .png)
    --all                     (tiles) list every tile

ENVIRONMENT:
    RUST_LOG                  Log filter, overrides -v/-q
    WAVEFRONT_TRACE=1         Write trace.json (chrome feature)",
        scenes = scenes::NAMES.join("|")
    );
}

fn env_filter(verbosity: u8) -> EnvFilter {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("wavefront={level}")))
}

#[cfg(feature = "chrome")]
fn init_tracing(verbosity: u8) -> Option<tracing_chrome::FlushGuard> {
    let (chrome_layer, guard) = if env::var("WAVEFRONT_TRACE").ok().as_deref() == Some("1") {
        let (layer, guard) = tracing_chrome::ChromeLayerBuilder::new().file("trace.json").build();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter(verbosity))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(chrome_layer)
        .init();
    guard
}

#[cfg(not(feature = "chrome"))]
fn init_tracing(verbosity: u8) -> Option<()> {
    tracing_subscriber::registry()
        .with(env_filter(verbosity))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
    None
}

/// Options shared by `render` and `tiles`.
#[derive(Debug, Default)]
struct Options {
    config: RenderConfig,
    scene: Option<String>,
    output: Option<PathBuf>,
    all: bool,
}

fn value<T: FromStr>(args: &[&str], i: usize, name: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = args.get(i).with_context(|| format!("{name} needs a value"))?;
    raw.parse().with_context(|| format!("invalid value '{raw}' for {name}"))
}

fn parse_options(args: &[&str]) -> Result<Options> {
    // Config file first so flags override it regardless of order.
    let mut config = match args.iter().position(|&a| a == "--config") {
        Some(i) => {
            let path: PathBuf = value(args, i + 1, "--config")?;
            RenderConfig::load(&path).with_context(|| format!("loading {}", path.display()))?
        }
        None => RenderConfig::default(),
    };

    let mut opts = Options::default();
    let mut i = 0;
    while i < args.len() {
        let arg = args[i];
        match arg {
            "--config" => {}
            "--scene" => opts.scene = Some(value(args, i + 1, arg)?),
            "--width" => config.width = value(args, i + 1, arg)?,
            "--height" => config.height = value(args, i + 1, arg)?,
            "--samples" => config.samples = value(args, i + 1, arg)?,
            "--queues" => config.num_queues = value(args, i + 1, arg)?,
            "--states" => config.path_states_per_queue = value(args, i + 1, arg)?,
            "--seed" => config.seed = value(args, i + 1, arg)?,
            "--max-bounce" => config.max_bounce = value(args, i + 1, arg)?,
            "-o" | "--output" => opts.output = Some(value(args, i + 1, arg)?),
            "--fail-fast" => {
                config.failure_policy = FailurePolicy::FailFast;
                i += 1;
                continue;
            }
            "--all" => {
                opts.all = true;
                i += 1;
                continue;
            }
            other => bail!("unknown option '{other}'"),
        }
        i += 2;
    }

    config.validate()?;
    opts.config = config;
    Ok(opts)
}

fn cmd_render(args: &[&str]) -> Result<()> {
    let opts = parse_options(args)?;
    let config = opts.config;
    let scene_name = opts.scene.as_deref().unwrap_or("cornell");

    let (scene, camera) = scenes::build(scene_name, config.width, config.height)?;
    let globals = KernelGlobals::new(Arc::new(scene), camera, config.integrator_params());
    let device = Arc::new(CpuDevice::new(globals, CpuDeviceOptions::from_config(&config))?);
    let buffers = Arc::new(RenderBuffers::new(BufferParams::new(config.width, config.height))?);

    let mut work = PathTraceWorkTiled::new(device, buffers.clone(), config.clone())?;
    tracing::info!(
        scene = scene_name,
        width = config.width,
        height = config.height,
        samples = config.samples,
        queues = work.num_queues(),
        "rendering"
    );

    let start = Instant::now();
    let report = work.render();
    let elapsed = start.elapsed();

    println!("{report}");
    println!("Time: {:.3}s", elapsed.as_secs_f64());
    for kernel in PathKernel::ALL {
        let n = report.launches(kernel);
        if n > 0 {
            println!("  {:<24} {n} launches", kernel.name());
        }
    }

    // Write whatever reached the buffer before reporting failure.
    if let Some(path) = &opts.output {
        export::write_image(path, &buffers)?;
        println!("Wrote {}", path.display());
    }

    report.into_result()?;
    Ok(())
}

fn cmd_tiles(args: &[&str]) -> Result<()> {
    let opts = parse_options(args)?;
    let config = opts.config;

    let mut scheduler = WorkScheduler::new(config.path_states_per_queue);
    scheduler.reset(&BufferParams::new(config.width, config.height), 0, config.samples);

    println!(
        "Image {}x{}, {} samples, {} path states per queue",
        config.width, config.height, config.samples, config.path_states_per_queue
    );
    println!("Tile size: {} ({} paths)", scheduler.tile_size(), scheduler.tile_size().work_size());
    println!("Tiles: {}", scheduler.num_tiles());

    let shown = if opts.all { scheduler.num_tiles() } else { scheduler.num_tiles().min(16) };
    for index in 0..shown {
        if let Some(t) = scheduler.tile_at(index) {
            println!(
                "  #{:<5} x={:<5} y={:<5} {}x{} samples {}..{}",
                t.index,
                t.x,
                t.y,
                t.w,
                t.h,
                t.start_sample,
                t.start_sample + t.num_samples
            );
        }
    }
    if shown < scheduler.num_tiles() {
        println!("  ... {} more (use --all)", scheduler.num_tiles() - shown);
    }
    Ok(())
}

fn cmd_config(args: &[&str]) -> Result<()> {
    let config = RenderConfig::default();
    match args.first() {
        Some(path) => {
            config.save(path)?;
            println!("Wrote {path}");
        }
        None => println!("{}", serde_json::to_string_pretty(&config)?),
    }
    Ok(())
}
