//! Playback queue engine
//!
//! - `queue_manager`: pending tracks with dedup and genre checks
//! - `scheduler`: the single task owning all mutable engine state
//! - `timer`: completion timer posting back to the scheduler
//! - `state`: playback state and the published status report
//! - `engine`: cloneable facade used by the web layer

pub mod engine;
pub mod queue_manager;
pub mod scheduler;
pub mod state;
pub mod timer;

pub use engine::{AddOutcome, EngineSettings, HandoffMode, PlaybackEngine, PlaybackOutcome};
pub use queue_manager::{QueueManager, Rejection, Selection};
pub use state::{NowPlayingInfo, PlaybackState, StatusReport};
