//! Event storage and reporting
//!
//! Events live in three priority-banded bounded FIFO queues. Numbering is a
//! single atomic counter decoupled from the storage lock, so concurrent
//! publishers observe a total order on event numbers without serializing on
//! the queues. Listeners are notified outside the lock.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use tracing::{debug, warn};

use crate::interaction::config::EngineConfig;
use crate::interaction::domain_types::{
    EventNumber, EventPriority, FabricIndex, MaxEventsPerPriority, SubscriptionId,
};
use crate::interaction::messages::{EventDataIb, EventPath, EventReportIb, ReportData};

/// One stored event occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// The event source.
    pub path: EventPath,
    /// Monotonic number allocated at publish time.
    pub event_number: EventNumber,
    /// Priority band the record is stored in.
    pub priority: EventPriority,
    /// Wall-clock capture time, milliseconds since the UNIX epoch.
    pub epoch_timestamp_ms: u64,
    /// Opaque TLV-encoded event payload.
    pub data: Bytes,
    /// Fabric the event is scoped to; 0 means unscoped.
    pub fabric_index: FabricIndex,
}

/// Observer notified after each publish.
///
/// Callbacks run outside the storage lock and must not re-enter the
/// publishing thread's lock-sensitive paths.
pub trait EventListener: Send + Sync {
    /// Called once per published record.
    fn on_event(&self, record: &EventRecord);
}

struct EventStore {
    queues: [VecDeque<EventRecord>; 3],
    listeners: Vec<Arc<dyn EventListener>>,
}

/// Priority-banded event storage with monotonic numbering.
pub struct EventManager {
    next_event_number: AtomicU64,
    max_events_per_priority: usize,
    store: RwLock<EventStore>,
}

impl EventManager {
    /// Creates a manager bounded by `max_events_per_priority` per band.
    #[must_use]
    pub fn new(max_events_per_priority: MaxEventsPerPriority) -> Self {
        Self {
            next_event_number: AtomicU64::new(1),
            max_events_per_priority: max_events_per_priority.as_usize(),
            store: RwLock::new(EventStore {
                queues: [VecDeque::new(), VecDeque::new(), VecDeque::new()],
                listeners: Vec::new(),
            }),
        }
    }

    /// Creates a manager from an engine configuration.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.max_events_per_priority)
    }

    /// Publishes one event and returns its number.
    ///
    /// When the target priority queue is full, the oldest record in that
    /// queue is evicted. Listeners are notified after the lock is released.
    pub fn publish_event(
        &self,
        path: EventPath,
        priority: EventPriority,
        data: Bytes,
        fabric_index: FabricIndex,
    ) -> EventNumber {
        let number = self.next_event_number.fetch_add(1, Ordering::Relaxed);
        let record = EventRecord {
            path,
            event_number: EventNumber::new(number),
            priority,
            epoch_timestamp_ms: epoch_millis(),
            data,
            fabric_index,
        };

        let listeners = {
            let mut store = self.write();
            let queue = &mut store.queues[priority.band()];
            if queue.len() >= self.max_events_per_priority {
                if let Some(evicted) = queue.pop_front() {
                    warn!(
                        evicted = evicted.event_number.as_u64(),
                        ?priority,
                        "event queue full, dropping oldest record"
                    );
                }
            }
            queue.push_back(record.clone());
            store.listeners.clone()
        };

        debug!(number, ?priority, "event published");
        for listener in listeners {
            listener.on_event(&record);
        }
        record.event_number
    }

    /// Returns records from the requested priority queues in storage order.
    ///
    /// An empty `priorities` slice selects all three bands in declaration
    /// order. Records are filtered by minimum event number, by exact path
    /// equality when a path is given, and by fabric: a non-zero filter fabric
    /// only matches records that are unscoped or scoped to the same fabric.
    #[must_use]
    pub fn get_events(
        &self,
        path: Option<&EventPath>,
        min_event_number: Option<EventNumber>,
        fabric_index: FabricIndex,
        priorities: &[EventPriority],
    ) -> Vec<EventRecord> {
        let bands: &[EventPriority] = if priorities.is_empty() {
            &EventPriority::ALL
        } else {
            priorities
        };

        let store = self.read();
        let mut records = Vec::new();
        for priority in bands {
            for record in &store.queues[priority.band()] {
                if let Some(min) = min_event_number {
                    if record.event_number < min {
                        continue;
                    }
                }
                if !fabric_matches(fabric_index, record.fabric_index) {
                    continue;
                }
                if let Some(path) = path {
                    if record.path != *path {
                        continue;
                    }
                }
                records.push(record.clone());
            }
        }
        records
    }

    /// The most recently allocated event number; 0 before any publish.
    #[must_use]
    pub fn latest_event_number(&self) -> u64 {
        self.next_event_number.load(Ordering::Relaxed) - 1
    }

    /// Registers a listener.
    pub fn add_listener(&self, listener: Arc<dyn EventListener>) {
        self.write().listeners.push(listener);
    }

    /// Removes a previously registered listener, compared by identity.
    pub fn remove_listener(&self, listener: &Arc<dyn EventListener>) {
        self.write()
            .listeners
            .retain(|held| !Arc::ptr_eq(held, listener));
    }

    /// Drains all queues. The event counter is not reset: later publishes
    /// continue the monotonic sequence.
    pub fn clear(&self) {
        let mut store = self.write();
        for queue in &mut store.queues {
            queue.clear();
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, EventStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, EventStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new(MaxEventsPerPriority::default())
    }
}

fn fabric_matches(filter: FabricIndex, record: FabricIndex) -> bool {
    // Unscoped records match any filter; unscoped filters match any record.
    filter.is_unscoped() || record.is_unscoped() || filter == record
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Builds ReportData messages out of stored event records.
pub struct EventReporter;

impl EventReporter {
    /// Builds a report carrying the given records.
    #[must_use]
    pub fn report(
        records: &[EventRecord],
        subscription_id: Option<SubscriptionId>,
        suppress_response: bool,
    ) -> ReportData {
        ReportData {
            subscription_id,
            attribute_reports: Vec::new(),
            event_reports: records.iter().map(record_to_report).collect(),
            more_chunks: false,
            suppress_response,
        }
    }

    /// Builds an unsolicited report: no subscription, no reply expected.
    #[must_use]
    pub fn unsolicited(records: &[EventRecord]) -> ReportData {
        Self::report(records, None, true)
    }
}

pub(crate) fn record_to_report(record: &EventRecord) -> EventReportIb {
    EventReportIb::Data(EventDataIb {
        path: record.path,
        event_number: record.event_number,
        priority: record.priority,
        epoch_timestamp_ms: record.epoch_timestamp_ms,
        data: record.data.clone(),
    })
}
