//! Meteor Atlas - meteorite landing data preparation
//!
//! Loads landing tables, tags each landing with the country and continent it
//! fell in, and derives the small aggregate tables a dashboard charts.

pub mod config;
pub mod data;
pub mod session;
pub mod spatial;
pub mod stats;

pub use config::{ConfigError, Settings, ViewSettings};
pub use session::{ExportTable, Session, SessionError};
