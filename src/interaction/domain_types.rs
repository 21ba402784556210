//! Domain types for the Interaction Model engine
//!
//! Strongly-typed protocol scalars to prevent primitive obsession: endpoint,
//! cluster, and leaf identifiers, event numbering, fabric scoping, and the
//! validated configuration values used by the fragmenter and event manager.

use nutype::nutype;
use serde::{Deserialize, Serialize};

/// Numbered addressable unit on a node, hosting a set of clusters.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    From,
    Into
))]
pub struct EndpointId(u16);

/// Numeric identifier of a cluster on an endpoint.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    From,
    Into
))]
pub struct ClusterId(u32);

/// Identifier of an attribute within a cluster.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    From,
    Into
))]
pub struct AttributeId(u32);

/// Identifier of a command within a cluster.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    From,
    Into
))]
pub struct CommandId(u32);

/// Identifier of an event within a cluster.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    From,
    Into
))]
pub struct EventId(u32);

/// Index into a list-typed attribute.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    From,
    Into
))]
pub struct ListIndex(u16);

/// Node identifier within a fabric.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    From,
    Into
))]
pub struct NodeId(u64);

/// Exchange identifier assigned by the exchange layer.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    From,
    Into
))]
pub struct ExchangeId(u16);

/// Subscription identifier carried in ReportData messages.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    From,
    Into
))]
pub struct SubscriptionId(u32);

/// Correlation reference tying an invoke response entry to its request entry.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    From,
    Into
))]
pub struct CommandRef(u16);

/// Cluster data version carried alongside attribute data.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    From,
    Into
))]
pub struct DataVersion(u32);

/// Fabric index scoping events and access control; 0 means unscoped.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    Default,
    From,
    Into
), default = 0)]
pub struct FabricIndex(u8);

impl FabricIndex {
    /// The unscoped fabric index (0), matching any filter.
    #[must_use]
    pub fn unscoped() -> Self {
        Self::new(0)
    }

    /// True when this index is the unscoped sentinel.
    #[must_use]
    pub fn is_unscoped(&self) -> bool {
        self.into_inner() == 0
    }
}

/// Strictly monotonic event sequence number; 0 is never allocated.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    From,
    Into
))]
pub struct EventNumber(u64);

impl EventNumber {
    /// Gets the value as u64.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.into_inner()
    }
}

/// Event priority band; each band has its own bounded queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventPriority {
    /// Diagnostic events, first to be dropped under pressure.
    Debug,
    /// Informational events.
    Info,
    /// Events that must survive the longest.
    Critical,
}

impl EventPriority {
    /// All bands in declaration order.
    pub const ALL: [EventPriority; 3] = [
        EventPriority::Debug,
        EventPriority::Info,
        EventPriority::Critical,
    ];

    pub(crate) fn band(self) -> usize {
        match self {
            EventPriority::Debug => 0,
            EventPriority::Info => 1,
            EventPriority::Critical => 2,
        }
    }
}

/// Maximum transmission unit the fragmenter budgets against.
#[nutype(
    validate(greater_or_equal = 128, less_or_equal = 65_535),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Serialize,
        Deserialize,
        Display,
        Default,
        TryFrom,
        Into
    ),
    default = 1280
)]
pub struct Mtu(usize);

impl Mtu {
    /// Gets the value as usize.
    #[must_use]
    pub fn as_usize(&self) -> usize {
        self.into_inner()
    }
}

/// Per-message envelope overhead subtracted from the MTU.
#[nutype(
    validate(less_or_equal = 1024),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Serialize,
        Deserialize,
        Display,
        Default,
        TryFrom,
        Into
    ),
    default = 100
)]
pub struct HeaderOverhead(usize);

impl HeaderOverhead {
    /// Gets the value as usize.
    #[must_use]
    pub fn as_usize(&self) -> usize {
        self.into_inner()
    }
}

/// Bound on each priority-banded event queue.
#[nutype(
    validate(greater_or_equal = 1, less_or_equal = 100_000),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Serialize,
        Deserialize,
        Display,
        Default,
        TryFrom,
        Into
    ),
    default = 50
)]
pub struct MaxEventsPerPriority(usize);

impl MaxEventsPerPriority {
    /// Gets the value as usize.
    #[must_use]
    pub fn as_usize(&self) -> usize {
        self.into_inner()
    }
}
