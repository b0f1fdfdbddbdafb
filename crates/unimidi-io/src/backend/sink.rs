//! Delivery path from a backend callback into an input handle's queue.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use unimidi_core::{Codec, MidiMessage, RunningStatusParser};

use crate::config::IgnoreTypes;

/// A received message with its arrival time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedMessage {
    pub message: MidiMessage,
    /// Microseconds on the backend's clock.
    pub timestamp: u64,
    /// Time since the previous queued message. Zero for the first one.
    pub delta: Duration,
}

/// Handed to a backend when an input connection is made.
///
/// Backends call [`deliver`](Self::deliver) from whatever thread their driver
/// uses. Bytes are parsed, filtered and pushed into a bounded queue; when the
/// queue is full the newest message is dropped and counted.
#[derive(Clone)]
pub struct InputSink {
    shared: Arc<SinkShared>,
}

struct SinkShared {
    label: String,
    tx: Sender<TimedMessage>,
    state: Mutex<SinkState>,
    ignore: AtomicU8,
    epoch: Instant,
    dropped: AtomicU64,
    malformed: AtomicU64,
}

struct SinkState {
    parser: RunningStatusParser,
    last_timestamp: Option<u64>,
}

impl InputSink {
    pub(crate) fn new(
        label: impl Into<String>,
        codec: Codec,
        ignore: IgnoreTypes,
        capacity: usize,
    ) -> (Self, Receiver<TimedMessage>) {
        let (tx, rx) = bounded(capacity.max(1));
        let shared = SinkShared {
            label: label.into(),
            tx,
            state: Mutex::new(SinkState {
                parser: RunningStatusParser::new(codec),
                last_timestamp: None,
            }),
            ignore: AtomicU8::new(ignore.to_bits()),
            epoch: Instant::now(),
            dropped: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
        };
        (
            Self {
                shared: Arc::new(shared),
            },
            rx,
        )
    }

    /// Delivers raw bytes as received from the driver.
    ///
    /// `timestamp` is in microseconds; pass `None` when the driver has no
    /// clock of its own and the sink will stamp on arrival.
    pub fn deliver(&self, timestamp: Option<u64>, bytes: &[u8]) {
        let shared = &*self.shared;
        let timestamp =
            timestamp.unwrap_or_else(|| shared.epoch.elapsed().as_micros() as u64);
        let ignore = IgnoreTypes::from_bits(shared.ignore.load(Ordering::Relaxed));

        let mut state = shared.state.lock();
        let SinkState {
            parser,
            last_timestamp,
        } = &mut *state;

        parser.feed(bytes, |result| match result {
            Ok(message) => {
                if ignore.ignores(&message) {
                    return;
                }
                let delta = match *last_timestamp {
                    Some(prev) => Duration::from_micros(timestamp.saturating_sub(prev)),
                    None => Duration::ZERO,
                };
                let queued = shared.push(TimedMessage {
                    message,
                    timestamp,
                    delta,
                });
                if queued {
                    *last_timestamp = Some(timestamp);
                }
            }
            Err(e) => {
                shared.malformed.fetch_add(1, Ordering::Relaxed);
                warn!("Discarding malformed input on '{}': {}", shared.label, e);
            }
        });
    }

    pub fn ignore_types(&self) -> IgnoreTypes {
        IgnoreTypes::from_bits(self.shared.ignore.load(Ordering::Relaxed))
    }

    pub(crate) fn set_ignore_types(&self, ignore: IgnoreTypes) {
        self.shared.ignore.store(ignore.to_bits(), Ordering::Relaxed);
    }

    pub(crate) fn dropped_count(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    pub(crate) fn malformed_count(&self) -> u64 {
        self.shared.malformed.load(Ordering::Relaxed)
    }
}

impl SinkShared {
    /// Returns true if the message was queued.
    fn push(&self, message: TimedMessage) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped == 1 {
                    warn!("Input queue full on '{}', dropping messages", self.label);
                } else {
                    debug!("Input queue full on '{}' ({} dropped)", self.label, dropped);
                }
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink(capacity: usize) -> (InputSink, Receiver<TimedMessage>) {
        InputSink::new("test", Codec::default(), IgnoreTypes::ALL, capacity)
    }

    #[test]
    fn test_deliver_queues_parsed_messages() {
        let (sink, rx) = sink(8);
        sink.deliver(Some(1_000), &[0x90, 0x3C, 0x7F]);
        sink.deliver(Some(3_500), &[0x80, 0x3C, 0x00]);

        let first = rx.try_recv().unwrap();
        assert_eq!(first.message.as_bytes(), &[0x90, 0x3C, 0x7F]);
        assert_eq!(first.timestamp, 1_000);
        assert_eq!(first.delta, Duration::ZERO);

        let second = rx.try_recv().unwrap();
        assert_eq!(second.delta, Duration::from_micros(2_500));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_running_status_spans_callbacks() {
        let (sink, rx) = sink(8);
        sink.deliver(Some(0), &[0xB0, 7, 100]);
        sink.deliver(Some(10), &[7, 90]);
        assert_eq!(rx.try_recv().unwrap().message.as_bytes(), &[0xB0, 7, 100]);
        assert_eq!(rx.try_recv().unwrap().message.as_bytes(), &[0xB0, 7, 90]);
    }

    #[test]
    fn test_ignored_types_are_filtered() {
        let (sink, rx) = sink(8);
        sink.deliver(None, &[0xF8, 0xFE, 0xF0, 0x01, 0xF7]);
        assert!(rx.try_recv().is_err());

        sink.set_ignore_types(IgnoreTypes::NONE);
        sink.deliver(None, &[0xF8, 0xF0, 0x01, 0xF7]);
        assert!(rx.try_recv().unwrap().message.is_timing());
        assert!(rx.try_recv().unwrap().message.is_sysex());
    }

    #[test]
    fn test_full_queue_drops_newest() {
        let (sink, rx) = sink(2);
        for note in 60..64 {
            sink.deliver(None, &[0x90, note, 100]);
        }
        assert_eq!(sink.dropped_count(), 2);
        assert_eq!(rx.try_recv().unwrap().message.note(), Some(60));
        assert_eq!(rx.try_recv().unwrap().message.note(), Some(61));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_delta_skips_dropped_messages() {
        let (sink, rx) = sink(1);
        sink.deliver(Some(1_000), &[0x90, 60, 100]);
        sink.deliver(Some(2_000), &[0x90, 61, 100]);
        assert_eq!(sink.dropped_count(), 1);

        assert_eq!(rx.try_recv().unwrap().message.note(), Some(60));
        sink.deliver(Some(5_000), &[0x90, 62, 100]);
        let next = rx.try_recv().unwrap();
        assert_eq!(next.message.note(), Some(62));
        assert_eq!(next.delta, Duration::from_micros(4_000));
    }

    #[test]
    fn test_malformed_input_is_counted_not_queued() {
        let (sink, rx) = sink(4);
        sink.deliver(None, &[0x3C, 0x7F]);
        assert_eq!(sink.malformed_count(), 2);
        assert!(rx.try_recv().is_err());
    }
}
