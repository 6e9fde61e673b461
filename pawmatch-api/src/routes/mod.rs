use std::sync::Arc;

use pawmatch_shared::errors::{AppError, AppResult};

use crate::AppState;

pub mod discover;
pub mod health;
pub mod likes;
pub mod matches;
pub mod messages;
pub mod pets;

/// Runs a synchronous service call on tokio's blocking pool.
pub(crate) async fn blocking<T, F>(state: &Arc<AppState>, f: F) -> AppResult<T>
where
    F: FnOnce(&AppState) -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || f(state.as_ref()))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
}
