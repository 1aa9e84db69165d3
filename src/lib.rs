//! deskchat - helpdesk chat core: markdown rendering, typewriter reveal, and
//! ticket escalation

pub mod backend;
pub mod commands;
pub mod config;
pub mod error;
pub mod escalation;
pub mod markup;
pub mod reveal;
pub mod session;
pub mod telemetry;
pub mod template;
