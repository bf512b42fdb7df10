use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::pubsub::Publisher;
use serde::{Deserialize, Serialize};

use super::AggregateEntry;

/// Channel capacity for cascade events
/// Set to 8 so a burst of finalizations cascading through several layers
/// fits without dropping anything before the host drains the channel
pub const EVENT_CHANNEL_CAPACITY: usize = 8;

/// Number of subscribers that can listen to cascade events
/// - Subscriber 0: upload relay
/// - Subscriber 1: presentation (web page / chat bot)
pub const EVENT_SUBSCRIBERS: usize = 2;

/// Number of publishers (just the cascade)
pub const EVENT_PUBLISHERS: usize = 1;

/// Events published by the cascade to notify subscribers of new aggregates
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum CascadeEvent {
    /// An emitting layer finalized an entry
    Finalized { layer: usize, entry: AggregateEntry },
}

/// Receiver for entries finalized by emitting layers
///
/// Called synchronously from inside [`log`](super::AggregationCascade::log),
/// so implementations must return promptly and must not block.
pub trait EmitSink {
    fn emit(&mut self, layer: usize, entry: AggregateEntry);
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSink;

impl EmitSink for NoSink {
    fn emit(&mut self, _layer: usize, _entry: AggregateEntry) {}
}

impl<F> EmitSink for F
where
    F: FnMut(usize, AggregateEntry),
{
    fn emit(&mut self, layer: usize, entry: AggregateEntry) {
        self(layer, entry)
    }
}

/// Publishes every emitted entry on a pub-sub channel.
///
/// Uses `publish_immediate`, so a full channel drops its oldest message
/// instead of blocking the sampling loop.
impl<M, const CAP: usize, const SUBS: usize, const PUBS: usize> EmitSink
    for Publisher<'_, M, CascadeEvent, CAP, SUBS, PUBS>
where
    M: RawMutex,
{
    fn emit(&mut self, layer: usize, entry: AggregateEntry) {
        self.publish_immediate(CascadeEvent::Finalized { layer, entry });
    }
}
