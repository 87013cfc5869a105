//! Desktop driver for the pricecurve core.
//!
//! Feeds a synthetic price stream into a [`CurveService`] on an accelerated
//! clock while reader threads issue range queries against it, the way the
//! serving layer would. A subscriber drains the event channel and the run
//! ends with a per-scale summary.
//!
//! # Environment
//!
//! Read from the process environment, after loading an optional `.env`:
//!
//! | Variable              | Default | Meaning                               |
//! |-----------------------|---------|---------------------------------------|
//! | `PRICECURVE_SAMPLES`  | 200000  | Number of samples to ingest           |
//! | `PRICECURVE_STEP_SECS`| 10      | Simulated seconds between samples     |
//! | `PRICECURVE_READERS`  | 4       | Concurrent query threads              |
//! | `PRICECURVE_ORDERING` | reject  | `trust` or `reject` out-of-order data |
//!
//! Verbosity is controlled with `RUST_LOG`.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use embassy_sync::pubsub::{PubSubChannel, WaitResult};
use log::{error, info, warn};

use pricecurve_core::events::CurveSubscriber;
use pricecurve_core::{
    CurveChannel, CurveConfig, CurveEvent, CurveReader, CurveService, FrameScale, OrderingPolicy,
    RangeStats, Timestamp,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Global pub-sub channel for curve events
static CURVE_CHANNEL: CurveChannel = PubSubChannel::new();

/// Resolutions the reader threads cycle through
const QUERY_RESOLUTIONS: [&str; 4] = ["second", "1m", "hour", "1d"];

/// Queries per reader between progress checks of the writer
const QUERY_BATCH: usize = 100;

#[derive(Debug, Clone, Copy)]
struct SimulatorConfig {
    samples: u64,
    step_secs: i64,
    readers: usize,
    ordering: OrderingPolicy,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            samples: 200_000,
            step_secs: 10,
            readers: 4,
            ordering: OrderingPolicy::Reject,
        }
    }
}

impl SimulatorConfig {
    fn from_env() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            info!("No .env loaded ({e}), using process environment only");
        }

        let defaults = Self::default();
        Self {
            samples: env_or("PRICECURVE_SAMPLES", defaults.samples),
            step_secs: env_or("PRICECURVE_STEP_SECS", defaults.step_secs).max(1),
            readers: env_or("PRICECURVE_READERS", defaults.readers),
            ordering: env_or("PRICECURVE_ORDERING", defaults.ordering),
        }
    }
}

/// Parse `key` from the environment, falling back to `default` when it is
/// unset or malformed.
fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + core::fmt::Display,
    T::Err: core::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(e) => {
                warn!("Ignoring {key}={raw}: {e}, using {default}");
                default
            }
        },
        Err(_) => default,
    }
}

// ---------------------------------------------------------------------------
// Mock data generation
// ---------------------------------------------------------------------------

/// Generates a synthetic price that wanders over several periods.
struct MockPriceGenerator {
    /// Simulated clock, seconds since epoch
    now_secs: i64,
    step_secs: i64,
}

impl MockPriceGenerator {
    fn new(start_secs: i64, step_secs: i64) -> Self {
        Self {
            now_secs: start_secs,
            step_secs,
        }
    }

    /// Advance the simulated clock and return the next `(timestamp, price)`.
    fn next_price(&mut self) -> (Timestamp, f64) {
        self.now_secs += self.step_secs;
        let t = self.now_secs as f64;

        // Intraday swing, a weekly cycle and a slow yearly drift
        let price = 30_000.0
            + 400.0 * (t / 3_600.0).sin()
            + 1_500.0 * (t / 604_800.0).sin()
            + 5_000.0 * (t / 31_536_000.0).cos()
            + 25.0 * (t / 37.0).cos();

        (Timestamp::from_secs(self.now_secs), price)
    }
}

// ---------------------------------------------------------------------------
// Readers
// ---------------------------------------------------------------------------

/// Issue range queries until the writer finishes. Returns the number answered.
fn run_reader(id: usize, reader: CurveReader, writer_done: &AtomicBool) -> usize {
    let mut answered = 0;

    loop {
        // Read before querying so the last batch sees the finished curve
        let finished = writer_done.load(Ordering::Acquire);

        let curve = reader.curve();
        let (Some(first), Some(last)) = (curve.first_sample(), curve.last_sample()) else {
            thread::yield_now();
            if finished {
                return answered;
            }
            continue;
        };
        let span = (last.timestamp.as_millis() - first.timestamp.as_millis()).max(1);

        for i in 0..QUERY_BATCH {
            let resolution = QUERY_RESOLUTIONS[(id + i) % QUERY_RESOLUTIONS.len()];
            let offset = (span / QUERY_BATCH as i64) * i as i64;
            let from = Timestamp::from_millis(first.timestamp.as_millis() + offset);
            let to = Timestamp::from_millis(from.as_millis() + span / 4);

            match reader.stats(from, to, resolution) {
                Ok(_) => answered += 1,
                Err(e) => error!("Reader {id}: query failed: {e}"),
            }
        }

        if finished {
            return answered;
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();

    let config = SimulatorConfig::from_env();
    info!("Starting pricecurve simulator: {:?}", config);

    let service = CurveService::new(CurveConfig {
        ordering: config.ordering,
    })
    .with_channel(&CURVE_CHANNEL);

    let mut subscriber: CurveSubscriber<'static> = match CURVE_CHANNEL.subscriber() {
        Ok(subscriber) => subscriber,
        Err(e) => {
            error!("Failed to subscribe to curve events: {:?}", e);
            return;
        }
    };

    let writer_done = AtomicBool::new(false);
    let mut promotions = 0usize;
    let mut lagged = 0u64;
    let started = Instant::now();

    let answered: usize = thread::scope(|scope| {
        let readers: Vec<_> = (0..config.readers)
            .map(|id| {
                let reader = service.reader();
                let writer_done = &writer_done;
                scope.spawn(move || run_reader(id, reader, writer_done))
            })
            .collect();

        let start_secs = Timestamp::now().as_millis() / 1000;
        let mut generator = MockPriceGenerator::new(start_secs, config.step_secs);
        for n in 0..config.samples {
            let (timestamp, price) = generator.next_price();
            if let Err(e) = service.ingest(timestamp, price) {
                error!("Ingest failed at sample {n}: {e}");
                break;
            }

            // --- Event channel ---------------------------------------------
            while let Some(result) = subscriber.try_next_message() {
                match result {
                    WaitResult::Lagged(missed) => lagged += missed,
                    WaitResult::Message(CurveEvent::Promoted(_)) => promotions += 1,
                    WaitResult::Message(CurveEvent::Sample(_)) => {}
                }
            }

            if n > 0 && n % 100_000 == 0 {
                info!("Ingested {n} samples, simulated time {timestamp}");
            }
        }
        writer_done.store(true, Ordering::Release);

        readers
            .into_iter()
            .map(|handle| handle.join().unwrap_or_default())
            .sum()
    });

    // -----------------------------------------------------------------------
    // Summary
    // -----------------------------------------------------------------------
    let reader = service.reader();
    let curve = reader.curve();

    info!(
        "Finished in {:.2?}: {} queries answered, {} promotions, {} events lagged",
        started.elapsed(),
        answered,
        promotions,
        lagged
    );
    info!("{}", curve.lifetime_stats());

    for scale in FrameScale::ALL {
        let window = curve
            .window(scale)
            .map(|w| format!("open since {}", w.start))
            .unwrap_or_else(|| "empty".into());
        let spread = RangeStats::from_samples(&curve.samples(scale)).map_or(0.0, |s| s.spread());
        info!(
            "{:>6} ({:>3}): {:>8} samples, spread {:.2}, window {}",
            scale,
            scale.label(),
            curve.len(scale),
            spread,
            window
        );
    }

    match reader.export("second") {
        Ok(bytes) => info!("Second-scale snapshot: {} bytes", bytes.len()),
        Err(e) => error!("Snapshot export failed: {e}"),
    }
}
