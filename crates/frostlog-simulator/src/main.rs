//! Desktop driver for the frostlog statistics cascade.
//!
//! Plays the roles the firmware's collaborators play on the device:
//!
//! - the sampling loop, feeding synthetic freezer readings on a fixed cadence;
//! - the upload relay, draining finalized aggregates from the event channel
//!   and encoding them with `postcard` as they would go over the wire;
//! - the presentation layer, printing the summary the status page and the
//!   chat bot show.
//!
//! Set `RUST_LOG=debug` to also see per-layer reports and finalizations.

use std::process::ExitCode;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::Parser;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pubsub::{PubSubChannel, Subscriber};
use log::{debug, error, info, warn};

use frostlog_core::config::DEFAULT_DEPTH;
use frostlog_core::{
    CascadeConfig, CascadeEvent, DefaultCascade, EVENT_CHANNEL_CAPACITY, EVENT_PUBLISHERS,
    EVENT_SUBSCRIBERS, QueryResult, SharedCascade, Timestamp,
};

/// Channel between the cascade's emitting layers and the upload relay
static CASCADE_EVENTS: PubSubChannel<
    CriticalSectionRawMutex,
    CascadeEvent,
    EVENT_CHANNEL_CAPACITY,
    EVENT_SUBSCRIBERS,
    EVENT_PUBLISHERS,
> = PubSubChannel::new();

type EventSubscriber = Subscriber<
    'static,
    CriticalSectionRawMutex,
    CascadeEvent,
    EVENT_CHANNEL_CAPACITY,
    EVENT_SUBSCRIBERS,
    EVENT_PUBLISHERS,
>;

#[derive(Parser, Debug)]
#[command(
    name = "frostlog-simulator",
    about = "Feed synthetic freezer readings through the frostlog cascade"
)]
struct Args {
    /// Number of readings to generate
    #[arg(long, default_value_t = 5000)]
    samples: u32,

    /// Simulated seconds between readings
    #[arg(long, default_value_t = 60)]
    period_secs: u32,

    /// Timestamp of the first reading [default: now]
    #[arg(long)]
    start: Option<Timestamp>,

    /// Layer whose finalized entries are uploaded (repeatable)
    #[arg(long = "emit-layer", default_values_t = [4])]
    emit_layers: Vec<usize>,

    /// Print the summary every N readings
    #[arg(long, default_value_t = 500)]
    query_every: u32,

    /// Freezer set point in °C
    #[arg(long, default_value_t = -18.0, allow_hyphen_values = true)]
    set_point: f64,

    /// Wall-clock delay between readings in milliseconds
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,
}

impl Args {
    fn cascade_config(&self) -> CascadeConfig<DEFAULT_DEPTH> {
        let mut config = CascadeConfig::default();
        for &layer in &self.emit_layers {
            if layer >= DEFAULT_DEPTH {
                warn!(
                    "Ignoring emit layer {} (cascade has {} layers)",
                    layer, DEFAULT_DEPTH
                );
                continue;
            }
            config = config.with_emit(layer);
        }
        config
    }
}

// ---------------------------------------------------------------------------
// Mock data generation
// ---------------------------------------------------------------------------

/// Compressor cycle period in seconds
const COMPRESSOR_PERIOD_SECS: f64 = 2400.0;

/// The door is opened once every this many seconds
const DOOR_PERIOD_SECS: u32 = 6 * 3600;

/// How long an opened door keeps warming the compartment
const DOOR_OPEN_SECS: u32 = 300;

/// Generates synthetic freezer readings that vary over time.
struct MockFreezer {
    set_point: f64,
}

impl MockFreezer {
    fn new(set_point: f64) -> Self {
        Self { set_point }
    }

    /// Temperature in °C at `elapsed_secs` since the first reading.
    fn reading(&self, elapsed_secs: u32) -> f64 {
        let t = f64::from(elapsed_secs);
        let compressor = 1.5 * (t / COMPRESSOR_PERIOD_SECS * core::f64::consts::TAU).sin();
        let drift = 0.4 * (t / 86_400.0 * core::f64::consts::TAU).cos();

        let since_door = elapsed_secs % DOOR_PERIOD_SECS;
        let door = if since_door < DOOR_OPEN_SECS {
            6.0 * (1.0 - f64::from(since_door) / f64::from(DOOR_OPEN_SECS))
        } else {
            0.0
        };

        self.set_point + compressor + drift + door
    }
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Stand-in for the spreadsheet upload: encodes each emitted aggregate.
fn relay_uploads(subscriber: &mut EventSubscriber) {
    while let Some(event) = subscriber.try_next_message_pure() {
        let CascadeEvent::Finalized { layer, entry } = event;
        match postcard::to_allocvec(&event) {
            Ok(payload) => info!(
                "Uploading layer {} aggregate: date={} meanValue={:.2} maxValue={:.2} ({} bytes)",
                layer,
                entry.timestamp,
                entry.mean,
                entry.max,
                payload.len()
            ),
            Err(e) => error!("Failed to encode layer {} aggregate: {:?}", layer, e),
        }
    }
}

/// Stand-in for the status page and chat bot.
fn render_status(result: &QueryResult) -> String {
    match result {
        QueryResult::NoData => String::from("No stats have been collected yet"),
        QueryResult::Summary(summary) => format!(
            "Since {} n = {:.2} ({:.0} samples) Max = {:.2} Mean = {:.2}",
            summary.oldest, summary.count, summary.samples, summary.max, summary.mean
        ),
    }
}

fn now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as Timestamp
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    info!("Starting frostlog simulator");

    let Ok(publisher) = CASCADE_EVENTS.publisher() else {
        error!("Failed to create cascade event publisher");
        return ExitCode::FAILURE;
    };
    let Ok(mut subscriber) = CASCADE_EVENTS.subscriber() else {
        error!("Failed to create upload subscriber");
        return ExitCode::FAILURE;
    };

    let cascade = match DefaultCascade::new(args.cascade_config(), publisher) {
        Ok(cascade) => cascade,
        Err(e) => {
            error!("Invalid cascade configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let cascade = SharedCascade::new(cascade);

    let freezer = MockFreezer::new(args.set_point);
    let start = args.start.unwrap_or_else(now);
    let query_every = args.query_every.max(1);
    info!(
        "Logging {} readings, {} s apart, starting at {}",
        args.samples, args.period_secs, start
    );

    for n in 0..args.samples {
        let elapsed = n.saturating_mul(args.period_secs);
        let timestamp = start.saturating_add(elapsed);

        cascade.log(freezer.reading(elapsed), timestamp);
        relay_uploads(&mut subscriber);

        if (n + 1) % query_every == 0 {
            info!("{}", render_status(&cascade.query()));
        }

        if args.delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(args.delay_ms));
        }
    }

    cascade.with(|cascade| {
        for layer in cascade.layers() {
            debug!("{}", layer);
            for entry in layer.history() {
                debug!("  {}", entry);
            }
        }
    });
    info!("{}", render_status(&cascade.query()));
    info!("Simulator exiting");

    ExitCode::SUCCESS
}
