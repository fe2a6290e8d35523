use serde::{Deserialize, Serialize};

/// A named booking slot.
///
/// `id` is assigned by the store and is absent on copies that were never
/// persisted (for example the body of a gateway write).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "reservationName", alias = "name")]
    #[sqlx(rename = "reservation_name")]
    pub name: String,
}

impl Reservation {
    /// Unpersisted reservation
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for Reservation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.id {
            Some(id) => write!(f, "Reservation{{id={}, reservationName='{}'}}", id, self.name),
            None => write!(f, "Reservation{{id=null, reservationName='{}'}}", self.name),
        }
    }
}
