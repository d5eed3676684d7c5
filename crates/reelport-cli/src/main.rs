//! Reelport command line interface.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reelport_media::PortraitConverter;
use reelport_models::{Resolution, DEFAULT_TARGET_HEIGHT, DEFAULT_TARGET_WIDTH};

/// Convert a landscape video into a portrait one.
#[derive(Debug, Parser)]
#[command(
    name = "reelport",
    version,
    about = "Landscape to portrait video converter"
)]
struct Args {
    /// Input video file (mp4, mov, avi, mkv)
    input: PathBuf,

    /// Output video file (mp4, mov, mkv)
    output: PathBuf,

    /// Target output width
    #[arg(long, default_value_t = DEFAULT_TARGET_WIDTH)]
    width: u32,

    /// Target output height
    #[arg(long, default_value_t = DEFAULT_TARGET_HEIGHT)]
    height: u32,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    let args = Args::parse();

    // Ctrl-C flips the cancellation signal; the encode is killed between
    // progress batches and the partial output removed.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling");
            let _ = cancel_tx.send(true);
        }
    });

    let converter = PortraitConverter::new()
        .with_target(Resolution::new(args.width, args.height))
        .with_cancel(cancel_rx);

    match converter.convert(&args.input, &args.output).await {
        Ok(report) => {
            info!(
                output = %args.output.display(),
                resolution = %report.output_resolution,
                elapsed_ms = report.elapsed_ms,
                "conversion complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("conversion failed: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize tracing with colored output for dev, JSON for production.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("reelport_cli=info".parse().expect("static directive"))
        .add_directive("reelport_media=info".parse().expect("static directive"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default_target() {
        let args = Args::parse_from(["reelport", "in.mp4", "out.mp4"]);
        assert_eq!(args.width, 1080);
        assert_eq!(args.height, 1920);
    }

    #[test]
    fn test_args_custom_target() {
        let args = Args::parse_from([
            "reelport", "in.mp4", "out.mp4", "--width", "720", "--height", "1280",
        ]);
        assert_eq!(args.width, 720);
        assert_eq!(args.height, 1280);
    }

    #[test]
    fn test_args_require_both_paths() {
        assert!(Args::try_parse_from(["reelport", "in.mp4"]).is_err());
    }
}
