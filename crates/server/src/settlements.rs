//! Settlement endpoints: suggestions, recording and history.

use axum::{
    Extension, Json,
    extract::{Path, State},
};

use api_types::settlement::{
    SettleNew, SettleOutcome, SettlementView, SettlementsResponse, SuggestionView,
    SuggestionsResponse,
};

use crate::{ServerError, server::ServerState, user};

pub async fn suggest(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
) -> Result<Json<SuggestionsResponse>, ServerError> {
    let suggestions = state
        .engine
        .suggest_settlements(&group_id, &user.username)
        .await?
        .into_iter()
        .map(|transfer| SuggestionView {
            from: transfer.from,
            to: transfer.to,
            amount_minor: transfer.amount_minor,
        })
        .collect();

    Ok(Json(SuggestionsResponse { suggestions }))
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
    Json(payload): Json<SettleNew>,
) -> Result<Json<SettleOutcome>, ServerError> {
    let outcome = state
        .engine
        .settle(
            &group_id,
            &payload.from_user,
            &payload.to_user,
            payload.amount_minor,
            payload.note.as_deref(),
            &user.username,
        )
        .await?;

    Ok(Json(SettleOutcome {
        settlement_id: outcome.settlement_id,
        settled_split_ids: outcome.settled_split_ids,
        settled_minor: outcome.settled_minor,
        remaining_minor: outcome.remaining_minor,
    }))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
) -> Result<Json<SettlementsResponse>, ServerError> {
    let settlements = state
        .engine
        .list_group_settlements(&group_id, &user.username)
        .await?
        .into_iter()
        .map(|settlement| SettlementView {
            id: settlement.id,
            payer_id: settlement.payer_id,
            receiver_id: settlement.receiver_id,
            amount_minor: settlement.amount_minor,
            description: settlement.description,
            created_at: settlement.created_at,
        })
        .collect();

    Ok(Json(SettlementsResponse { settlements }))
}
