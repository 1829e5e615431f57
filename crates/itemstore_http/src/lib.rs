//! HTTP surface for the item store.
//!
//! # Responsibility
//! - Route `/{typePlural}` and `/{typePlural}/{name}` requests to `ItemService`.
//! - Singularize and validate path segments, decode JSON bodies.
//! - Translate service errors into stable status codes.
//!
//! # Invariants
//! - Handlers never touch the repository directly; every call goes through
//!   the service.
//! - Every request gets its own `OperationContext`.

pub mod error;
mod handlers;
pub mod inflect;

pub use error::{status_for, ApiError, HttpError};
pub use handlers::ListItemsResponse;

use axum::routing::get;
use axum::Router;
use itemstore_core::{ItemRepository, ItemService, MemoryItemRepository, OperationContext};
use std::sync::Arc;
use std::time::Duration;

/// Shared handler state: one service over one repository.
#[derive(Clone)]
pub struct AppState {
    service: Arc<ItemService<Arc<dyn ItemRepository>>>,
    request_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(repo: Arc<dyn ItemRepository>) -> Self {
        Self {
            service: Arc::new(ItemService::new(repo)),
            request_timeout: None,
        }
    }

    /// State over a fresh, empty in-memory repository.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryItemRepository::new()))
    }

    /// Abandons store calls that start after `timeout` has elapsed.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn service(&self) -> &ItemService<Arc<dyn ItemRepository>> {
        &self.service
    }

    fn context(&self) -> OperationContext {
        match self.request_timeout {
            Some(timeout) => OperationContext::with_timeout(timeout),
            None => OperationContext::background(),
        }
    }
}

/// Builds the item API router over `state`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/{type_plural}",
            get(handlers::list_items).post(handlers::create_item),
        )
        .route(
            "/{type_plural}/{name}",
            get(handlers::read_item)
                .put(handlers::replace_item)
                .patch(handlers::patch_item)
                .delete(handlers::delete_item),
        )
        .with_state(state)
}
