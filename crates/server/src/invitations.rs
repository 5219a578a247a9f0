//! Invitation endpoints.
//!
//! Token delivery is out of scope: the created token is returned to the
//! inviting admin, who passes it along however they like.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use api_types::invitation::{
    InvitationAccept, InvitationAccepted, InvitationCreated, InvitationNew, InvitationStatus,
    InvitationView, InvitationsResponse,
};

use crate::{ServerError, server::ServerState, user};

fn map_status(status: engine::InvitationStatus) -> InvitationStatus {
    match status {
        engine::InvitationStatus::Pending => InvitationStatus::Pending,
        engine::InvitationStatus::Accepted => InvitationStatus::Accepted,
        engine::InvitationStatus::Expired => InvitationStatus::Expired,
    }
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
    Json(payload): Json<InvitationNew>,
) -> Result<(StatusCode, Json<InvitationCreated>), ServerError> {
    let invitation = state
        .engine
        .create_invitation(&group_id, &payload.email, &user.username)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(InvitationCreated {
            id: invitation.id,
            token: invitation.token,
            expires_at: invitation.expires_at,
        }),
    ))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
) -> Result<Json<InvitationsResponse>, ServerError> {
    let invitations = state
        .engine
        .list_group_invitations(&group_id, &user.username)
        .await?
        .into_iter()
        .map(|invitation| InvitationView {
            id: invitation.id,
            invitee_email: invitation.invitee_email,
            status: map_status(invitation.status),
            created_at: invitation.created_at,
            expires_at: invitation.expires_at,
            accepted_at: invitation.accepted_at,
        })
        .collect();

    Ok(Json(InvitationsResponse { invitations }))
}

pub async fn cancel(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path((group_id, invitation_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .cancel_invitation(&group_id, invitation_id, &user.username)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn accept(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<InvitationAccept>,
) -> Result<Json<InvitationAccepted>, ServerError> {
    let group_id = state
        .engine
        .accept_invitation(&payload.token, &user.username)
        .await?;

    Ok(Json(InvitationAccepted { group_id }))
}
