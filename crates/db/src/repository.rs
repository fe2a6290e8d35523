//! Reservation store accessor.

use async_trait::async_trait;

use crate::entity::Reservation;
use crate::error::DbError;
use crate::pool::DbPool;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 2000;

/// Tables backing [`SqliteReservationRepository`].
pub const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS reservation (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        reservation_name TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS reservation_name_idx ON reservation (reservation_name);
    CREATE TABLE IF NOT EXISTS processed_message (
        message_id   TEXT PRIMARY KEY,
        processed_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
"#;

/// Zero-based page selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: u32,
    pub size: u32,
}

impl PageRequest {
    /// Page `number` of `size` items; size is clamped to `1..=MAX_PAGE_SIZE`.
    pub fn new(number: u32, size: u32) -> Self {
        Self {
            number,
            size: size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    fn offset(&self) -> i64 {
        i64::from(self.number) * i64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

/// One page of results plus totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub size: u32,
    pub total_elements: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u32 {
        let size = u64::from(self.size.max(1));
        u32::try_from(self.total_elements.div_ceil(size)).unwrap_or(u32::MAX)
    }
}

/// Create and read access to the durable reservation set.
///
/// There is deliberately no update or delete.
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Persist a new reservation and return it with its assigned id
    async fn create(&self, name: &str) -> Result<Reservation, DbError>;

    /// Persist a reservation unless `message_id` was already processed.
    /// Returns `None` for a duplicate delivery.
    async fn create_once(
        &self,
        message_id: &str,
        name: &str,
    ) -> Result<Option<Reservation>, DbError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Reservation>, DbError>;

    /// Reservations ordered by id
    async fn find_all(&self, page: PageRequest) -> Result<Page<Reservation>, DbError>;

    async fn find_all_unpaged(&self) -> Result<Vec<Reservation>, DbError>;

    /// Exact, case-sensitive name match
    async fn find_by_reservation_name(&self, name: &str) -> Result<Vec<Reservation>, DbError>;

    async fn count(&self) -> Result<u64, DbError>;
}

/// SQLite implementation of [`ReservationRepository`].
#[derive(Debug, Clone)]
pub struct SqliteReservationRepository {
    pool: DbPool,
}

impl SqliteReservationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReservationRepository for SqliteReservationRepository {
    async fn create(&self, name: &str) -> Result<Reservation, DbError> {
        let reservation = sqlx::query_as::<_, Reservation>(
            "INSERT INTO reservation (reservation_name) VALUES (?) RETURNING id, reservation_name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(reservation)
    }

    async fn create_once(
        &self,
        message_id: &str,
        name: &str,
    ) -> Result<Option<Reservation>, DbError> {
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query("INSERT OR IGNORE INTO processed_message (message_id) VALUES (?)")
            .bind(message_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if claimed == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let reservation = sqlx::query_as::<_, Reservation>(
            "INSERT INTO reservation (reservation_name) VALUES (?) RETURNING id, reservation_name",
        )
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(reservation))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Reservation>, DbError> {
        let reservation = sqlx::query_as::<_, Reservation>(
            "SELECT id, reservation_name FROM reservation WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(reservation)
    }

    async fn find_all(&self, page: PageRequest) -> Result<Page<Reservation>, DbError> {
        // Count and slice must observe the same snapshot
        let mut tx = self.pool.begin().await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reservation")
            .fetch_one(&mut *tx)
            .await?;
        let items = sqlx::query_as::<_, Reservation>(
            "SELECT id, reservation_name FROM reservation ORDER BY id LIMIT ? OFFSET ?",
        )
        .bind(i64::from(page.size))
        .bind(page.offset())
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        let total_elements = u64::try_from(count).unwrap_or_default();

        Ok(Page {
            items,
            number: page.number,
            size: page.size,
            total_elements,
        })
    }

    async fn find_all_unpaged(&self) -> Result<Vec<Reservation>, DbError> {
        let items = sqlx::query_as::<_, Reservation>(
            "SELECT id, reservation_name FROM reservation ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn find_by_reservation_name(&self, name: &str) -> Result<Vec<Reservation>, DbError> {
        let items = sqlx::query_as::<_, Reservation>(
            "SELECT id, reservation_name FROM reservation WHERE reservation_name = ? ORDER BY id",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn count(&self) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reservation")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}
