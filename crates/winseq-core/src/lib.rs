//! winseq-core - Action sequences for name-addressable desktop windows
//!
//! A closed action model (focus, move, click, type, wait, prompt for a point),
//! named-point variables, and an engine that runs sequences against pluggable
//! window/input collaborators and returns a structured report.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use winseq_core::prelude::*;
//!
//! let seq = ActionSequence::from_json_str(r#"[
//!     {"type": "focus_window", "name": "editor"},
//!     {"type": "send_text", "text": "hello"}
//! ]"#)?;
//! let report = Runner::new(&desktop, &desktop).run(&seq, Variables::new());
//! assert!(report.success);
//! ```

pub mod action;
pub mod error;
pub mod prompt;
pub mod registry;
pub mod runner;
pub mod vars;
pub mod window;

pub use action::{Action, ActionSequence, MouseButton, Point, Target};
pub use error::{Error, ErrorCode, Result};
pub use prompt::{ChannelPrompter, PointPrompter, PointRequest, PointSender};
pub use registry::{Geometry, WindowEntry, WindowInfo, WindowRegistry};
pub use runner::{ExecutionReport, FailurePolicy, Runner, RunnerConfig, StepReport};
pub use vars::Variables;
pub use window::{InputInjector, WindowController};

pub mod prelude {
    pub use crate::action::{Action, ActionSequence, MouseButton, Point, Target};
    pub use crate::error::{Error, ErrorCode, Result};
    pub use crate::prompt::{ChannelPrompter, PointPrompter, PointRequest, PointSender};
    pub use crate::registry::{WindowInfo, WindowRegistry};
    pub use crate::runner::{ExecutionReport, FailurePolicy, Runner, RunnerConfig};
    pub use crate::vars::Variables;
    pub use crate::window::{InputInjector, WindowController};
}
