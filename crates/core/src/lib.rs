//! `geosync-core` — Core data types shared across the workspace.
//!
//! A [`Frame`] is an ordered collection of [`Record`]s under a common column
//! schema; a [`Value`] is a single normalized scalar. No IO here.

pub mod frame;
pub mod record;
pub mod value;

pub use frame::Frame;
pub use record::{PointXY, Record};
pub use value::Value;
