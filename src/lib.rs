/// Simulation tick number (count of completed fixed ticks).
pub type Tick = u64;

// Engine configuration
pub mod config;

// Error taxonomy
pub mod error;

// 2D vector math
pub mod math;

// Entity model and spawn validation
pub mod entity;

// Entity registry (owned simulation state)
pub mod state;

// Client input buffering
pub mod input;

// Domain events and the in-tick event bus
pub mod event;

// Mementos and the snapshot ring buffer
pub mod snapshot;

// Per-tick rule pipeline
pub mod rules;

// Engine facade and tick scheduler
pub mod engine;

// Rollback and replay reconciliation
pub mod rollback;

pub use engine::Engine;
pub use error::EngineError;
