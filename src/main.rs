use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use decode_bus::{DecoderConfig, HostLogLevel, VideoDecoder, WorkQueue};

mod cli;
mod consumer;
mod probe;

fn init_logging(level: log::LevelFilter) {
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .filter_module("decode_bus", level)
        .init();
}

fn load_settings(args: &cli::Args) -> anyhow::Result<serde_json::Value> {
    let Some(path) = &args.settings else {
        return Ok(serde_json::Value::Null);
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read settings {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid settings {}", path.display()))
}

fn decoder_config(args: &cli::Args) -> anyhow::Result<DecoderConfig> {
    let (width, height, frame_rate) = match (args.width, args.height, args.frame_rate) {
        (Some(width), Some(height), Some(frame_rate)) => (width, height, frame_rate),
        (width, height, frame_rate) => {
            let info = probe::probe_video(&args.ffprobe, &args.input)
                .with_context(|| format!("failed to probe {}", args.input.display()))?;
            (
                width.unwrap_or(info.width),
                height.unwrap_or(info.height),
                frame_rate.unwrap_or(info.frame_rate),
            )
        }
    };

    Ok(DecoderConfig::new(&args.input, width, height, frame_rate)
        .with_log_level(HostLogLevel::from(log::max_level()))
        .with_ffmpeg_path(&args.ffmpeg)
        .with_ignore_max_image_pixels(!args.enforce_image_limits))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    init_logging(args.log_level);

    let config = decoder_config(&args)?;
    let settings = Arc::new(load_settings(&args)?);
    log::info!(
        "decoding {} at {}x{} @ {} fps",
        config.input_path.display(),
        config.width,
        config.height,
        config.frame_rate
    );

    let (sender, queue) = WorkQueue::with_capacity(args.queue_capacity);
    let decoder = VideoDecoder::start(&config, sender, settings)?
        .spawn()
        .context("failed to spawn decoder thread")?;

    let stop = decoder.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("ctrl+c received, stopping decoder");
            stop.stop();
        }
        // a blocked read ignores the stop request
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("second ctrl+c, exiting");
            std::process::exit(130);
        }
    });

    let consumed = consumer::consume(Arc::new(queue), args.dump_dir.clone()).await;
    if consumed.is_err() {
        decoder.stop();
    }
    let outcome = tokio::task::spawn_blocking(move || decoder.join()).await?;
    let summary = consumed?;

    log::info!(
        "decoder {}: {} frames read, {} pairs consumed (indices {:?}..={:?})",
        outcome.state,
        outcome.frames_read,
        summary.items,
        summary.first_index,
        summary.last_index
    );
    if summary.out_of_order > 0 {
        log::warn!("{} pairs arrived out of order", summary.out_of_order);
    }

    outcome.into_result().context("decoding failed")?;
    Ok(())
}
