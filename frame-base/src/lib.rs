//! # frame-base
//!
//! Ambient services for frame applications: JSON configuration sections,
//! tracing setup and a run loop delivering frame ticks.
//!
//! ## Configuration Example
//!
//! ```rust
//! use frame_base::{Config, RunLoopConfig};
//! use std::time::Duration;
//!
//! let config = Config::parse(r#"{"run_loop": {"tick": "20ms"}}"#).unwrap();
//! let run_loop = config.section::<RunLoopConfig>().unwrap();
//! assert_eq!(run_loop.tick, Some(Duration::from_millis(20)));
//! ```

mod config;
mod run_loop;
mod tracing;

pub use config::*;
pub use run_loop::*;
pub use tracing::*;
