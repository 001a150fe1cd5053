//! # Project RPS
//!
//! A student workload tracker. Courses hold tasks and materials; the active
//! tasks feed the **Pain Score**, a single number describing how much
//! deadline pressure you are under right now.
//!
//! ## Pain Score
//!
//! Over the tasks that are not completed:
//!
//! ```text
//! days      = max(1, ceil((deadline - now) / 1 day))
//! score     = n * avg(difficulty)
//!           + sum(weight * difficulty / days)
//!           + sum(10 / days * difficulty / 5)   for tasks with days <= 3
//! ```
//!
//! rounded to the nearest integer. The score has no upper bound; the
//! dashboard clamps it for display only.
//!
//! ## Data rules
//!
//! * Every operation runs on behalf of a [`models::Session`]. Entities owned
//!   by another user are reported as not found.
//! * Course codes are unique per owner.
//! * `difficulty` is 1..=10 and `weight` is 1..=100; anything else is
//!   rejected, never clamped.
//! * A task has `completed_at` set exactly while its status is `completed`.
//!
//! ## Data Storage
//!
//! Everything lives in one JSON document, `rps.json`, in your local data
//! directory (`~/.local/share/rps` on Linux). Override it with `--data-dir`
//! or `RPS_DATA_DIR`.

pub mod commands;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod logging;
pub mod models;
pub mod pain;
pub mod storage;
pub mod tracker;

pub use error::{Result, RpsError};
