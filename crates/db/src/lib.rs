//! Persistence for the backing service.
//!
//! SQLite through sqlx: a pool factory, a migration runner for module
//! migrations, and the [`ReservationRepository`] store accessor.

mod entity;
mod error;
mod migrate;
mod pool;
mod repository;

pub use entity::Reservation;
pub use error::DbError;
pub use migrate::run_migrations;
pub use pool::{create_pool, health_check, DbPool};
pub use repository::{
    Page, PageRequest, ReservationRepository, SqliteReservationRepository, DEFAULT_PAGE_SIZE,
    MAX_PAGE_SIZE, SCHEMA,
};

