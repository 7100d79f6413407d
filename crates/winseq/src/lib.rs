//! # winseq
//!
//! Drive a desktop by window name: run scripted action sequences, record live
//! input into new ones, and keep them under friendly names.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use winseq::prelude::*;
//!
//! let settings = Settings::load()?;
//! let desktop = DryRunDesktop::open(settings.window_cache())?;
//! let seq = settings.store().load("open mail")?;
//!
//! let report = Runner::new(&desktop, &desktop)
//!     .config(settings.runner_config()?)
//!     .run(&seq, Variables::new());
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod desktop;
pub mod settings;

// Re-export core
pub use winseq_core::*;

// Re-export recorder module
pub use winseq_recorder as recorder;
pub use winseq_recorder::{
    CaptureSource, EventHub, KeyCode, RawEvent, Recorder, RecordingConfig, SequenceStore,
};

pub use desktop::DryRunDesktop;
pub use settings::Settings;

/// Prelude - import everything you need
pub mod prelude {
    pub use winseq_core::prelude::*;
    pub use winseq_recorder::prelude::*;

    pub use crate::desktop::DryRunDesktop;
    pub use crate::settings::Settings;
}
