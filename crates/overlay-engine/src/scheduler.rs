//! Viewport-driven fetch orchestration.
//!
//! One attached overlay is one actor task owning all scheduler state:
//! debounce timer, dedup key, rate gate, backoff counter, preferred attempt
//! parameters, and the in-flight cycle handle. Viewport events and detach
//! arrive over a command channel, so every state transition happens on the
//! actor task and no locking is needed.
//!
//! Lifecycle per cycle: debounce the viewport churn, defer past the rate
//! gate, clamp the viewport, cancel the superseded in-flight cycle, then try
//! the strategy builder's attempts in order until one yields features. The
//! winning parameter combination seeds the next cycle's attempt list.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use overlay_common::{BoundingBox, FeatureCollection, OverlayError, OverlayLayer};
use wfs_protocol::{axis, build_attempts, classify, AttemptParameters};

use crate::config::OverlayConfig;
use crate::sink::VectorSink;
use crate::transport::FeatureTransport;

enum Command {
    Viewport(BoundingBox),
    Detach,
}

/// Handle to an attached overlay.
///
/// Dropping the handle (or calling [`detach`](Self::detach)) aborts in-flight
/// work, clears the layer, and forgets all cached state, so a future
/// reattachment starts fresh.
pub struct WfsOverlay {
    tx: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl WfsOverlay {
    /// Attach an overlay: spawn its scheduler task.
    pub fn attach(
        config: OverlayConfig,
        layer: OverlayLayer,
        transport: Arc<dyn FeatureTransport>,
        sink: Arc<dyn VectorSink>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_loop(config, Arc::new(layer), transport, sink, rx));
        Self { tx, task }
    }

    /// Notify the scheduler that the map viewport moved.
    pub fn viewport_changed(&self, bounds: BoundingBox) {
        let _ = self.tx.send(Command::Viewport(bounds));
    }

    /// Detach the overlay and wait for its task to finish cleanup.
    pub async fn detach(self) {
        let _ = self.tx.send(Command::Detach);
        let _ = self.task.await;
    }
}

struct ActiveCycle {
    handle: JoinHandle<CycleOutcome>,
    cancel: CancellationToken,
    key: String,
}

enum CycleOutcome {
    /// At least one attempt produced non-empty, sanitized, reconciled
    /// features.
    Rendered {
        features: FeatureCollection,
        attempt: AttemptParameters,
    },
    /// Every attempt was exhausted but at least one returned a well-formed
    /// empty result and none hit a real error: there is nothing here.
    NoData,
    /// Every attempt was exhausted and at least one failed.
    Failed {
        error: OverlayError,
        last_attempt: AttemptParameters,
    },
    /// Superseded by a newer cycle; discard silently.
    Aborted,
}

async fn run_loop(
    config: OverlayConfig,
    layer: Arc<OverlayLayer>,
    transport: Arc<dyn FeatureTransport>,
    sink: Arc<dyn VectorSink>,
    mut rx: mpsc::UnboundedReceiver<Command>,
) {
    let mut pending: Option<BoundingBox> = None;
    let mut debounce_deadline: Option<Instant> = None;
    let mut inflight: Option<ActiveCycle> = None;
    let mut last_rendered_key: Option<String> = None;
    let mut preferred: Option<AttemptParameters> = None;
    let mut backoff = Duration::ZERO;
    let mut next_allowed_at = Instant::now();

    loop {
        let debounce_tick = async {
            match debounce_deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        let cycle_done = async {
            match inflight.as_mut() {
                Some(active) => (&mut active.handle).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            command = rx.recv() => match command {
                Some(Command::Viewport(bounds)) => {
                    let key = bounds.request_key();
                    if last_rendered_key.as_deref() == Some(key.as_str()) {
                        debug!(key = %key, "Viewport unchanged after rounding, skipping");
                        continue;
                    }
                    // (Re)start the quiet period; an in-flight cycle keeps
                    // running until the new one actually starts.
                    pending = Some(bounds);
                    debounce_deadline = Some(Instant::now() + config.debounce);
                }
                Some(Command::Detach) | None => break,
            },

            _ = debounce_tick => {
                let now = Instant::now();
                if now < next_allowed_at {
                    // Rate gate: defer, don't drop.
                    debug!("Fetch deferred by rate gate");
                    debounce_deadline = Some(next_allowed_at);
                    continue;
                }
                debounce_deadline = None;

                let Some(bounds) = pending.take() else { continue };
                let key = bounds.request_key();
                let viewport = bounds.clamp_to_area_km2(config.max_area_km2);

                // Only one fetch may be outstanding: the superseded cycle is
                // cancelled now, at new-cycle start.
                if let Some(previous) = inflight.take() {
                    previous.cancel.cancel();
                }

                let attempts = build_attempts(&layer.wfs, preferred.as_ref());
                let cancel = CancellationToken::new();
                debug!(key = %key, attempts = attempts.len(), "Starting fetch cycle");

                let handle = tokio::spawn(run_cycle(
                    transport.clone(),
                    layer.clone(),
                    viewport,
                    attempts,
                    cancel.clone(),
                ));
                inflight = Some(ActiveCycle { handle, cancel, key });
            },

            joined = cycle_done => {
                let active = inflight.take().expect("cycle completion without active cycle");
                let outcome = match joined {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!(error = %e, "Fetch cycle task failed");
                        CycleOutcome::Aborted
                    }
                };

                match outcome {
                    CycleOutcome::Rendered { features, attempt } => {
                        info!(
                            count = features.len(),
                            attempt = %attempt,
                            "WFS fetch succeeded"
                        );
                        sink.replace(features);
                        preferred = Some(attempt);
                        backoff = Duration::ZERO;
                        next_allowed_at = Instant::now() + config.min_request_spacing;
                        last_rendered_key = Some(active.key);
                    }
                    CycleOutcome::NoData => {
                        debug!("WFS fetch found no features for this viewport");
                        sink.clear();
                        backoff = Duration::ZERO;
                        next_allowed_at = Instant::now() + config.min_request_spacing;
                        last_rendered_key = Some(active.key);
                    }
                    CycleOutcome::Failed { error, last_attempt } => {
                        warn!(
                            error = %error,
                            attempt = %last_attempt,
                            "All WFS attempts failed for this cycle"
                        );
                        // Don't show stale data, and let the same viewport
                        // retry on the next change event.
                        sink.clear();
                        last_rendered_key = None;

                        if error.is_backoff_class() {
                            backoff = if backoff.is_zero() {
                                config.initial_backoff
                            } else {
                                (backoff * 2).min(config.max_backoff)
                            };
                            next_allowed_at = Instant::now() + backoff;
                        } else {
                            next_allowed_at = Instant::now() + config.initial_backoff;
                        }
                    }
                    CycleOutcome::Aborted => {
                        debug!("Fetch cycle aborted (superseded)");
                    }
                }
            },
        }
    }

    // Detach: abort in-flight work, clear the layer, forget cached state.
    if let Some(active) = inflight.take() {
        active.cancel.cancel();
    }
    sink.clear();
    debug!("Overlay detached");
}

/// Try each attempt in order until one yields non-empty features.
///
/// All attempts of a cycle run within the same debounce window with no extra
/// delay between them.
async fn run_cycle(
    transport: Arc<dyn FeatureTransport>,
    layer: Arc<OverlayLayer>,
    viewport: BoundingBox,
    attempts: Vec<AttemptParameters>,
    cancel: CancellationToken,
) -> CycleOutcome {
    let total = attempts.len();
    let mut last_error: Option<OverlayError> = None;
    let mut last_attempt: Option<AttemptParameters> = None;
    let mut saw_empty = false;

    for attempt in attempts {
        let url = match build_url(&layer, &attempt, &viewport) {
            Ok(url) => url,
            Err(e) => {
                last_error = Some(e);
                last_attempt = Some(attempt);
                continue;
            }
        };

        debug!(url = %url, attempt = %attempt, "Trying WFS request");

        match transport.fetch(url.as_str(), &cancel).await {
            Err(OverlayError::Aborted) => return CycleOutcome::Aborted,
            Err(e) => {
                debug!(error = %e, "WFS request failed, advancing to next attempt");
                last_error = Some(e);
                last_attempt = Some(attempt);
            }
            Ok(response) if !(200..300).contains(&response.status) => {
                debug!(status = response.status, "Non-2xx WFS response, advancing");
                last_error = Some(OverlayError::Http {
                    status: response.status,
                    body: excerpt(&response.body),
                });
                last_attempt = Some(attempt);
            }
            Ok(response) => match classify::parse_features(&response) {
                Err(e) => {
                    debug!(error = %e, "WFS response rejected, advancing");
                    last_error = Some(e);
                    last_attempt = Some(attempt);
                }
                Ok(None) => {
                    saw_empty = true;
                    last_attempt = Some(attempt);
                }
                Ok(Some(collection)) => {
                    let mut features = collection.sanitize();
                    if features.is_empty() {
                        saw_empty = true;
                        last_attempt = Some(attempt);
                        continue;
                    }
                    if axis::reconcile(&mut features, &viewport) {
                        debug!("Swapped coordinate axes to match viewport");
                    }
                    return CycleOutcome::Rendered { features, attempt };
                }
            },
        }
    }

    match (last_error, last_attempt) {
        (Some(last), Some(attempt)) => CycleOutcome::Failed {
            error: OverlayError::Exhausted {
                attempts: total,
                last: Box::new(last),
            },
            last_attempt: attempt,
        },
        _ if saw_empty => CycleOutcome::NoData,
        // An empty attempt list cannot happen (the builder always emits the
        // fixed fallback), but starve gracefully rather than panic.
        _ => CycleOutcome::NoData,
    }
}

fn build_url(
    layer: &OverlayLayer,
    attempt: &AttemptParameters,
    viewport: &BoundingBox,
) -> Result<reqwest::Url, OverlayError> {
    // Literal query assembly: WFS servers expect `bbox=a,b,c,d` and
    // `typeNames=ns:name` verbatim, and form-encoding the separators trips
    // up some of them.
    let query = attempt
        .query_params(&layer.wfs.type_name, viewport)
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");
    let separator = if layer.url.contains('?') { '&' } else { '?' };

    reqwest::Url::parse(&format!("{}{}{}", layer.url, separator, query))
        .map_err(|e| OverlayError::InvalidUrl(e.to_string()))
}

/// Single-line body excerpt for failure diagnostics.
fn excerpt(body: &str) -> String {
    body.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(200)
        .collect()
}
