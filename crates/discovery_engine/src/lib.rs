//! Discovery engine: persistence, search workers and the run coordinator.
mod context;
mod coordinator;
mod persist;
mod progress;
mod proxy;
mod search;
mod sensor;
mod source;
mod stores;
mod types;
mod worker;

pub use context::DiscoveryContext;
pub use coordinator::{Coordinator, CoordinatorConfig, RunReport, DEFAULT_WORKERS};
pub use persist::{ensure_output_dir, write_atomic, PersistError};
pub use progress::{LogProgressSink, NullProgressSink, ProgressSink};
pub use proxy::ProxyPool;
pub use search::{CandidateStream, SearchProvider, YtDlpSearch, YtDlpSettings};
pub use sensor::{TriggerGate, TriggerSensor};
pub use source::KeywordSource;
pub use stores::{Rehydrated, SnapshotStore, StateStore};
pub use types::{DiscoveryError, DiscoveryEvent, SearchError};
pub use worker::{KeywordHarvest, SearchWorker};
