//! Animated, structure-preserving reveal of rendered messages.

pub mod engine;
pub mod mount;
pub mod terminal;

pub use engine::{Clock, Frame, ManualClock, Outcome, Pacing, Reveal, ThreadClock};
pub use mount::{Epoch, MarkupBuffer, MountPoint, NodeId, SharedMount};
pub use terminal::{PRETTY_STYLE, Style, TEXT_STYLE, TerminalMount};
