use frostlog_core::{
    AggregateEntry, AggregationCascade, CascadeConfig, EmitSink, LayerState, QueryResult,
};
use proptest::prelude::*;

const CAPACITY: usize = 3;
const DEPTH: usize = 4;

/// Records finalized entries per layer; every layer emits in these tests.
#[derive(Debug, Default)]
struct RecordingSink {
    entries: [Vec<AggregateEntry>; DEPTH],
}

impl RecordingSink {
    fn finalized(&self, layer: usize) -> usize {
        self.entries[layer].len()
    }
}

impl EmitSink for RecordingSink {
    fn emit(&mut self, layer: usize, entry: AggregateEntry) {
        self.entries[layer].push(entry);
    }
}

type Cascade = AggregationCascade<RecordingSink, CAPACITY, DEPTH>;

fn cascade(intervals: [u32; DEPTH]) -> Cascade {
    let mut config = CascadeConfig::uniform(1);
    for (layer, interval) in intervals.into_iter().enumerate() {
        config = config.with_interval(layer, interval).with_emit(layer);
    }
    AggregationCascade::new(config, RecordingSink::default()).unwrap()
}

fn intervals() -> impl Strategy<Value = [u32; DEPTH]> {
    prop::array::uniform4(1u32..=3)
}

fn readings() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-40.0f64..10.0, 0..300)
}

fn coarsest_filling(cascade: &Cascade) -> bool {
    cascade
        .layer(DEPTH - 1)
        .is_some_and(|layer| layer.state() == LayerState::Filling)
}

#[test]
fn test_fresh_cascade_reports_no_data() {
    let cascade = cascade([2; DEPTH]);
    assert_eq!(cascade.query(), QueryResult::NoData);
    assert_eq!(cascade.effective_count(DEPTH - 1), Ok(0.0));
}

proptest! {
    #[test]
    fn history_never_exceeds_capacity(intervals in intervals(), values in readings()) {
        let mut cascade = cascade(intervals);
        for (t, value) in values.into_iter().enumerate() {
            cascade.log(value, t as u32 + 1);
            for layer in cascade.layers() {
                prop_assert!(layer.len() <= CAPACITY);
                prop_assert!(layer.pending_count() < layer.aggregation_interval());
            }
        }
    }

    #[test]
    fn latch_trips_once_on_first_overflow(intervals in intervals(), values in readings()) {
        let mut cascade = cascade(intervals);
        let mut previous = [LayerState::Filling; DEPTH];

        for (t, value) in values.into_iter().enumerate() {
            cascade.log(value, t as u32 + 1);
            for (index, layer) in cascade.layers().iter().enumerate() {
                if previous[index] == LayerState::Overflowed {
                    prop_assert_eq!(layer.state(), LayerState::Overflowed);
                }
                let overflowed = cascade.sink().finalized(index) > CAPACITY;
                prop_assert_eq!(layer.state() == LayerState::Overflowed, overflowed);
                previous[index] = layer.state();
            }
        }
    }

    #[test]
    fn overflowed_layers_forward_every_entry_once(intervals in intervals(), values in readings()) {
        let mut cascade = cascade(intervals);
        for (t, value) in values.into_iter().enumerate() {
            cascade.log(value, t as u32 + 1);
        }

        let sink = cascade.sink();
        for index in 0..DEPTH - 1 {
            let forwarded = sink.finalized(index).saturating_sub(CAPACITY);
            let interval = intervals[index + 1] as usize;
            let next = cascade.layer(index + 1).unwrap();
            prop_assert_eq!(sink.finalized(index + 1), forwarded / interval);
            prop_assert_eq!(next.pending_count() as usize, forwarded % interval);
        }
    }

    #[test]
    fn forwarded_entries_carry_their_values(intervals in intervals(), values in readings()) {
        let mut cascade = cascade(intervals);
        for (t, value) in values.into_iter().enumerate() {
            cascade.log(value, t as u32 + 1);
        }

        let sink = cascade.sink();
        for index in 0..DEPTH - 1 {
            // Everything past the first CAPACITY entries was fed upward
            let forwarded = sink.entries[index].get(CAPACITY..).unwrap_or_default();
            let interval = intervals[index + 1] as usize;

            for (group, coarse) in forwarded.chunks_exact(interval).zip(&sink.entries[index + 1]) {
                let mean = group.iter().map(|entry| entry.mean).sum::<f64>() / interval as f64;
                let max = group.iter().map(|entry| entry.max).fold(f64::NEG_INFINITY, f64::max);
                prop_assert!((coarse.mean - mean).abs() < 1e-9);
                prop_assert_eq!(coarse.max, max);
                prop_assert_eq!(Some(coarse.timestamp), group.last().map(|entry| entry.timestamp));
            }
        }
    }

    #[test]
    fn effective_count_accounts_for_every_sample(intervals in intervals(), values in readings()) {
        let mut cascade = cascade(intervals);
        let mut previous = 0.0;

        for (t, value) in values.into_iter().enumerate() {
            cascade.log(value, t as u32 + 1);
            if !coarsest_filling(&cascade) {
                break;
            }
            let samples = cascade.stats_through(DEPTH - 1).unwrap().sample_equivalent();
            prop_assert!((samples - (t + 1) as f64).abs() < 1e-6);
            prop_assert!(samples >= previous);
            previous = samples;
        }
    }

    #[test]
    fn summary_stays_within_logged_range(intervals in intervals(), values in readings()) {
        let mut cascade = cascade(intervals);
        for (t, value) in values.iter().enumerate() {
            cascade.log(*value, t as u32 + 1);
        }

        match cascade.query() {
            QueryResult::NoData => prop_assert!(values.len() < intervals[0] as usize),
            QueryResult::Summary(summary) => {
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                prop_assert!(summary.mean >= min - 1e-9 && summary.mean <= max + 1e-9);
                prop_assert!(summary.max >= min && summary.max <= max);
                prop_assert!(summary.oldest >= 1 && summary.oldest <= values.len() as u32);
            }
        }
    }

    #[test]
    fn one_interval_of_inputs_finalizes_one_entry(
        interval in 1u32..=8,
        seed in prop::collection::vec(-40.0f64..10.0, 8),
    ) {
        let config = CascadeConfig::uniform(interval);
        let mut cascade: AggregationCascade<_, CAPACITY, DEPTH> =
            AggregationCascade::new(config, frostlog_core::NoSink).unwrap();
        let values = &seed[..interval as usize];
        for (t, value) in values.iter().enumerate() {
            cascade.log(*value, t as u32 + 1);
        }

        let layer = cascade.layer(0).unwrap();
        prop_assert_eq!(layer.len(), 1);
        let entry = layer.history().next().copied().unwrap();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!((entry.mean - mean).abs() < 1e-9);
        prop_assert_eq!(entry.max, max);
        prop_assert_eq!(entry.timestamp, interval);
    }
}
