#![allow(dead_code)]

use axum_test::{TestResponse, TestServer};
use std::sync::Arc;
use std::time::Duration;
use url_vault::application::services::{IdentityService, LinkService};
use url_vault::domain::deletion_pipeline::{DeletionPipeline, PipelineSettings};
use url_vault::domain::repositories::LinkRepository;
use url_vault::infrastructure::persistence::MemoryLinkRepository;
use url_vault::routes::build_router;
use url_vault::state::AppState;

pub const BASE_URL: &str = "http://localhost:8080";
pub const TEST_SECRET: &str = "test-signing-secret";

pub fn test_pipeline_settings() -> PipelineSettings {
    PipelineSettings {
        queue_capacity: 100,
        workers: 2,
        batch_size: 10,
        flush_interval: Duration::from_millis(10),
        enqueue_timeout: Duration::from_millis(200),
    }
}

pub fn create_test_state_with(repository: Arc<dyn LinkRepository>) -> AppState {
    let pipeline = Arc::new(DeletionPipeline::spawn(
        repository.clone(),
        test_pipeline_settings(),
    ));
    let link_service = Arc::new(LinkService::new(
        repository,
        pipeline,
        BASE_URL,
        Duration::from_secs(5),
    ));
    let identity_service = Arc::new(IdentityService::new(TEST_SECRET));

    AppState::new(link_service, identity_service)
}

pub fn create_test_state() -> AppState {
    create_test_state_with(Arc::new(MemoryLinkRepository::in_memory()))
}

pub fn create_test_server() -> (TestServer, AppState) {
    let state = create_test_state();
    let server = TestServer::new(build_router(state.clone())).unwrap();
    (server, state)
}

/// Cookie header value for `owner_id`, signed with the test secret.
pub fn identity_cookie(owner_id: &str) -> String {
    let token = IdentityService::new(TEST_SECRET).sign(owner_id);
    format!("user_id={token}")
}

pub fn short_id_of(short_url: &str) -> String {
    short_url
        .strip_prefix(&format!("{BASE_URL}/"))
        .unwrap()
        .to_string()
}

pub fn set_cookie(response: &TestResponse) -> Option<String> {
    response
        .headers()
        .get("set-cookie")
        .map(|v| v.to_str().unwrap().to_string())
}

/// Polls the redirect endpoint until `short_id` answers with `status`.
pub async fn wait_for_status(server: &TestServer, short_id: &str, status: u16) -> bool {
    for _ in 0..100 {
        if server.get(&format!("/{short_id}")).await.status_code().as_u16() == status {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
