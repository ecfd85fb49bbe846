//! WFS overlay probe.
//!
//! Attaches the overlay engine to a live WFS endpoint, fires a single
//! viewport change, and prints what the fetch cycle produced. Useful for
//! checking which protocol dialect a server actually speaks before wiring a
//! layer into an application.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::sync::Notify;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use overlay_common::{BoundingBox, FeatureCollection, OverlayLayer, WfsParams};
use overlay_engine::{OverlayConfig, ReqwestTransport, VectorSink, WfsOverlay};

#[derive(Parser, Debug)]
#[command(name = "overlay-probe")]
#[command(about = "Run one WFS overlay fetch cycle against a live endpoint")]
struct Args {
    /// WFS endpoint URL
    #[arg(long, env = "WFS_URL")]
    url: String,

    /// Feature type to query (typeNames value)
    #[arg(long)]
    type_name: String,

    /// Viewport as "south,west,north,east" in degrees
    #[arg(long)]
    bbox: String,

    /// WFS version to prefer
    #[arg(long)]
    version: Option<String>,

    /// Output format to prefer (e.g. application/json)
    #[arg(long)]
    output_format: Option<String>,

    /// SRS name to prefer (e.g. EPSG:4326)
    #[arg(long)]
    srs_name: Option<String>,

    /// Per-request HTTP timeout in seconds
    #[arg(long, default_value = "15")]
    timeout_secs: u64,

    /// How long to wait for the fetch cycle before giving up, in seconds
    #[arg(long, default_value = "60")]
    wait_secs: u64,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Sink that stores the cycle outcome and wakes the waiter.
#[derive(Default)]
struct ProbeSink {
    outcome: Mutex<Option<Option<FeatureCollection>>>,
    notify: Notify,
}

impl VectorSink for ProbeSink {
    fn replace(&self, features: FeatureCollection) {
        *self.outcome.lock().unwrap() = Some(Some(features));
        self.notify.notify_one();
    }

    fn clear(&self) {
        let mut outcome = self.outcome.lock().unwrap();
        // Detach clears the layer too; keep the first real outcome.
        if outcome.is_none() {
            *outcome = Some(None);
            self.notify.notify_one();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let viewport = BoundingBox::from_corner_string(&args.bbox)
        .context("Failed to parse --bbox (expected 'south,west,north,east')")?;

    let layer = OverlayLayer {
        url: args.url.clone(),
        wfs: WfsParams {
            type_name: args.type_name.clone(),
            version: args.version.clone(),
            output_format: args.output_format.clone(),
            srs_name: args.srs_name.clone(),
        },
        z_index: None,
    };

    let config = OverlayConfig {
        // No pointer jitter to smooth out here; fetch almost immediately.
        debounce: Duration::from_millis(50),
        request_timeout: Duration::from_secs(args.timeout_secs),
        ..OverlayConfig::default()
    };

    info!(url = %args.url, type_name = %args.type_name, "Starting probe");

    let transport = Arc::new(ReqwestTransport::new(config.request_timeout));
    let sink = Arc::new(ProbeSink::default());
    let overlay = WfsOverlay::attach(config, layer, transport, sink.clone());

    overlay.viewport_changed(viewport);

    let waited =
        tokio::time::timeout(Duration::from_secs(args.wait_secs), sink.notify.notified()).await;

    let outcome = sink.outcome.lock().unwrap().clone();
    overlay.detach().await;

    if waited.is_err() {
        bail!("No fetch outcome within {} seconds", args.wait_secs);
    }

    match outcome {
        Some(Some(features)) => {
            println!("Fetched {} feature(s)", features.len());
            for (i, feature) in features.features.iter().enumerate() {
                let mut props: Vec<_> = feature
                    .properties
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect();
                props.sort();
                println!("  [{}] {}", i, props.join(" "));
            }
            Ok(())
        }
        Some(None) => {
            println!("No features rendered (empty result or all attempts failed)");
            std::process::exit(1);
        }
        None => bail!("Fetch cycle produced no outcome"),
    }
}
