//! Core engine module - sector state, ingestion, and output fan-out

mod clock;
mod engine;
mod event_bus;
mod registry;
mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{Engine, EngineStats, IngestOutcome};
pub use event_bus::{EventBus, OutputRecord, OutputSink};
pub use registry::{SectorHandle, SectorRegistry, SectorState};
pub use scheduler::Scheduler;
