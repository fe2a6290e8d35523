//! Reservation gateway and backing service.
//!
//! The gateway publishes new reservations on a message channel and serves
//! load-balanced reads with fallbacks. The backing service owns the store,
//! consumes the channel and exposes the paged reservation API.

pub mod app;
pub mod modules;

pub use app::{run, start_gateway, start_service, Role, Service};
