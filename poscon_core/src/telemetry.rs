//! Publications for observers of the control loop.
//!
//! Each subscriber gets its own bounded channel. Publishing never blocks: a
//! subscriber whose queue is full misses that publication, and one whose
//! receiver was dropped is removed.
use std::cmp::Ordering;
use std::sync::Mutex;

use crossbeam_channel as xch;

use crate::decimal::Decimal;

/// What the loop observed and did in one cycle.
///
/// Snapshots are identified by their cycle counter alone: equality and
/// ordering ignore every other field.
#[derive(Debug, Clone, Copy)]
pub struct KinematicSnapshot {
    pub counter: u64,
    pub phi: i64,
    pub rotation: Decimal,
    pub rpm: Decimal,
    pub cycle_time: Decimal,
    /// Command applied this cycle (0 unless running).
    pub drive: i32,
}

impl PartialEq for KinematicSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.counter == other.counter
    }
}

impl Eq for KinematicSnapshot {}

impl PartialOrd for KinematicSnapshot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KinematicSnapshot {
    fn cmp(&self, other: &Self) -> Ordering {
        self.counter.cmp(&other.counter)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Publication {
    Snapshot(KinematicSnapshot),
    /// New destination: the operator's value as displayed, and in pulses.
    Target { display: String, pulses: i64 },
    ProportionalGain(Decimal),
    IntegralGain(Decimal),
    AntiWindup(bool),
}

impl Publication {
    /// Display-ready key/value pairs.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Publication::Snapshot(s) => vec![
                ("counter", s.counter.to_string()),
                ("phi", s.phi.to_string()),
                ("rotation", s.rotation.to_string()),
                ("rpm", s.rpm.to_string()),
                ("cycle_time", s.cycle_time.to_string()),
                ("drive", s.drive.to_string()),
            ],
            Publication::Target { display, .. } => vec![("target", display.clone())],
            Publication::ProportionalGain(g) => vec![("kp", g.to_string())],
            Publication::IntegralGain(g) => vec![("ki", g.to_string())],
            Publication::AntiWindup(on) => vec![("anti_windup", on.to_string())],
        }
    }
}

pub struct Telemetry {
    capacity: usize,
    subscribers: Mutex<Vec<xch::Sender<Publication>>>,
}

impl Telemetry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> xch::Receiver<Publication> {
        let (tx, rx) = xch::bounded(self.capacity);
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn publish(&self, publication: &Publication) {
        let Ok(mut subs) = self.subscribers.lock() else {
            return;
        };
        subs.retain(|tx| match tx.try_send(publication.clone()) {
            Ok(()) => true,
            Err(xch::TrySendError::Full(_)) => {
                tracing::trace!("telemetry subscriber lagging; publication dropped");
                true
            }
            Err(xch::TrySendError::Disconnected(_)) => false,
        });
    }
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(counter: u64, phi: i64) -> KinematicSnapshot {
        KinematicSnapshot {
            counter,
            phi,
            rotation: Decimal::zero(3),
            rpm: Decimal::zero(3),
            cycle_time: Decimal::zero(3),
            drive: 0,
        }
    }

    #[test]
    fn snapshots_compare_by_counter_only() {
        assert_eq!(snapshot(3, 1), snapshot(3, 99));
        assert!(snapshot(2, 500) < snapshot(3, 0));
    }

    #[test]
    fn fields_are_formatted_at_scale() {
        let fields = Publication::Snapshot(snapshot(7, -4)).fields();
        assert_eq!(fields[0], ("counter", "7".to_string()));
        assert_eq!(fields[1], ("phi", "-4".to_string()));
        assert_eq!(fields[3], ("rpm", "0.000".to_string()));
        assert_eq!(
            Publication::AntiWindup(false).fields(),
            vec![("anti_windup", "false".to_string())]
        );
    }

    #[test]
    fn full_queue_drops_and_closed_queue_is_pruned() {
        let hub = Telemetry::new(1);
        let slow = hub.subscribe();
        let gone = hub.subscribe();
        drop(gone);
        hub.publish(&Publication::AntiWindup(true));
        hub.publish(&Publication::AntiWindup(false));
        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(slow.try_recv().unwrap(), Publication::AntiWindup(true));
        assert!(slow.try_recv().is_err());
    }
}
