use axum::extract::State;

use crate::auth::Caller;
use crate::models::Resource;
use crate::state::AppState;
use crate::{proceeds, Payload};

/// Any signed-in user may read the library.
pub async fn list(State(state): State<AppState>, _caller: Caller) -> Payload<Vec<Resource>> {
    proceeds(state.store.list_resources().await?)
}
