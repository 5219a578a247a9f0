//! Group endpoints.

use axum::{Extension, Json, extract::State, http::StatusCode};

use api_types::group::{GroupCreated, GroupNew, GroupView, GroupsResponse};

use crate::{ServerError, server::ServerState, user};

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<GroupNew>,
) -> Result<(StatusCode, Json<GroupCreated>), ServerError> {
    let id = state.engine.new_group(&payload.name, &user.username).await?;
    Ok((StatusCode::CREATED, Json(GroupCreated { id })))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<GroupsResponse>, ServerError> {
    let groups = state
        .engine
        .list_groups(&user.username)
        .await?
        .into_iter()
        .map(|group| GroupView {
            id: group.id,
            name: group.name,
            created_by: group.created_by,
            created_at: group.created_at,
        })
        .collect();

    Ok(Json(GroupsResponse { groups }))
}
