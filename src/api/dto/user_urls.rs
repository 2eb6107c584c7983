//! DTOs for owner link listing.

use serde::{Deserialize, Serialize};

use crate::domain::entities::OwnerLink;

/// A live link of the caller.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserUrlItem {
    pub short_url: String,
    pub original_url: String,
}

impl From<OwnerLink> for UserUrlItem {
    fn from(link: OwnerLink) -> Self {
        Self {
            short_url: link.short_url,
            original_url: link.original_url,
        }
    }
}
