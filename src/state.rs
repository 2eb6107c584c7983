//! Shared application state injected into every handler.

use std::sync::Arc;

use crate::application::services::{IdentityService, LinkService};

#[derive(Clone)]
pub struct AppState {
    pub link_service: Arc<LinkService>,
    pub identity_service: Arc<IdentityService>,
}

impl AppState {
    pub fn new(link_service: Arc<LinkService>, identity_service: Arc<IdentityService>) -> Self {
        Self {
            link_service,
            identity_service,
        }
    }
}
