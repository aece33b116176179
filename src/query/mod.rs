// Query module
//
// This module tracks long-lived query executions between client round-trips:
// - Registering queries under a (tenant, query id) key
// - Checking queries out for exclusive use and returning them
// - Reclaiming queries that stayed idle past their time-to-live

pub mod clock;
pub mod lease;
pub mod registry;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use lease::{QueryLease, RegisteredQuery};
pub use registry::{
    QueryEntryInfo, QueryRegistry, QueryState, RegistryStats, DEFAULT_QUERY_TTL,
};
pub use sweeper::{spawn_sweeper, SweeperHandle, DEFAULT_SWEEP_INTERVAL};
