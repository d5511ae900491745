use anyhow::{Context, Result, bail};
use std::path::PathBuf;

mod app;
mod config;
mod player;
mod ui;

fn main() -> Result<()> {
    use tracing::info;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marquee=info".into()),
        )
        .init();

    info!("Starting Marquee");

    let media_path = match std::env::args_os().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => bail!("usage: marquee <media-file>"),
    };
    if !media_path.is_file() {
        bail!("media file not found: {}", media_path.display());
    }

    // Initialize GTK, Adwaita and GStreamer before any widget or pipeline work
    gtk4::init().context("Failed to initialize GTK")?;
    libadwaita::init().context("Failed to initialize libadwaita")?;
    gstreamer::init().context("Failed to initialize GStreamer")?;

    app::MarqueeApp::new(media_path).run()
}
