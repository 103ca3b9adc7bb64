//! This crate turns a waste collection provider's pickup dates into iCalendar files.
//!
//! Calendars are cached on disk per query and regenerated once a day.
//! A server and a CLI are built on top of the [`pipeline::Pipeline`].

pub mod artifact_store;
pub mod cache_key;
pub mod calendar;
pub mod date_normalizer;
pub mod error;
pub mod garbage_client;
pub mod pipeline;

pub use error::{Error, Result};
