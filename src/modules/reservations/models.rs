use reservation_db::{Page, Reservation};
use serde::{Deserialize, Serialize};

/// Collection of reservations in the hypermedia envelope both services
/// speak: `{"_embedded":{"reservations":[..]},"page":{..}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationCollection {
    #[serde(rename = "_embedded", default)]
    pub embedded: Embedded,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<PageMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embedded {
    #[serde(default)]
    pub reservations: Vec<Reservation>,
}

/// Paging block of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
    pub number: u32,
}

impl ReservationCollection {
    /// Collection without paging metadata (search results)
    pub fn unpaged(reservations: Vec<Reservation>) -> Self {
        Self {
            embedded: Embedded { reservations },
            page: None,
        }
    }

    pub fn reservations(&self) -> &[Reservation] {
        &self.embedded.reservations
    }

    /// Names in the order the collection lists them
    pub fn into_names(self) -> Vec<String> {
        self.embedded
            .reservations
            .into_iter()
            .map(|reservation| reservation.name)
            .collect()
    }
}

impl From<Page<Reservation>> for ReservationCollection {
    fn from(page: Page<Reservation>) -> Self {
        let metadata = PageMetadata {
            size: page.size,
            total_elements: page.total_elements,
            total_pages: page.total_pages(),
            number: page.number,
        };
        Self {
            embedded: Embedded {
                reservations: page.items,
            },
            page: Some(metadata),
        }
    }
}
