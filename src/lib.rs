//! mentor-gate library crate
//!
//! Admission control for AI mentoring analysis calls: decides, for
//! every incoming code change, whether an expensive analysis should run
//! now, be served from cache, or be suppressed, and queues the admitted
//! ones for a periodic drain. Single controller instance, no
//! persistence across restarts.

pub mod bucket;
pub mod cache;
pub mod change;
pub mod config;
pub mod controller;
pub mod cooldown;
pub mod dispatch;
pub mod queue;
pub mod rules;
pub mod util;
