//! winseq-recorder - Turn live input into replayable action sequences
//!
//! A capture source pushes raw events (moves, button and key transitions) into
//! a recording session. The coalescer folds them into `winseq_core` actions:
//! move bursts collapse, double clicks merge, typing becomes `send_text`,
//! bound F-keys become `focus_window`, idle gaps become `wait`. The same
//! source can answer `prompt_point` through [`ClickPrompter`].
//!
//! ```rust,ignore
//! use winseq_recorder::prelude::*;
//!
//! let hub = Arc::new(EventHub::new());
//! let recorder = Recorder::new(hub.clone());
//! recorder.start(RecordingConfig::default().hotkey(1, "editor"))?;
//! hub.emit(RawEvent::key_down(0.0, "F1"));
//! let seq = recorder.stop()?;
//! ```

pub mod capture;
pub mod coalescer;
pub mod config;
pub mod events;
pub mod prompt;
pub mod session;
pub mod storage;

pub use capture::{CaptureSource, EventHub, SubscriptionId};
pub use coalescer::Coalescer;
pub use config::{FocusHotkey, RecordingConfig};
pub use events::{EventData, KeyCode, RawEvent};
pub use prompt::ClickPrompter;
pub use session::Recorder;
pub use storage::{SavedSequence, SequenceListing, SequenceStore};

pub mod prelude {
    pub use crate::capture::{CaptureSource, EventHub};
    pub use crate::config::{FocusHotkey, RecordingConfig};
    pub use crate::events::{EventData, KeyCode, RawEvent};
    pub use crate::prompt::ClickPrompter;
    pub use crate::session::Recorder;
    pub use crate::storage::SequenceStore;
    pub use std::sync::Arc;
}
