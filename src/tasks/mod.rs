//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of a backend.
//!
//! # Tasks
//! - Expiration Sweeper: Reclaims expired entries at the configured interval

mod sweeper;

pub use sweeper::{spawn_sweeper, sweep};
