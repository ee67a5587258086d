//! `rasterctl` entrypoint: renders the demo scene and writes it out as a PPM.
use std::path::{Path, PathBuf};
use std::sync::Once;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "rasterctl", version, about = "Raster device demo renderer")]
struct Args {
    /// Output PPM path.
    #[arg(default_value = "demo.ppm")]
    output: PathBuf,
    /// Canvas width in pixels.
    #[arg(long, default_value_t = 96)]
    width: u32,
    /// Canvas height in pixels.
    #[arg(long, default_value_t = 64)]
    height: u32,
    /// Optional TOML file overriding engine resource limits.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join("rasterctl.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }
    let file_appender = tracing_appender::rolling::never(log_dir, "rasterctl.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(_) => Some(guard),
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(?info, "panic");
            default_panic(info);
        }));
    });
}

fn main() -> Result<()> {
    let _log_guard = configure_logging();
    install_panic_hook();

    let args = Args::parse();
    let limits = match &args.config {
        Some(path) => rg_core::load_from(path),
        None => rg_core::EngineLimits::default(),
    };
    info!(
        width = args.width,
        height = args.height,
        output = ?args.output,
        ?limits,
        "rendering demo scene"
    );

    let device = rg_cli::render_demo_scene(args.width, args.height)?;
    rg_cli::write_ppm(&args.output, &device)?;

    info!(output = ?args.output, "wrote ppm");
    Ok(())
}
