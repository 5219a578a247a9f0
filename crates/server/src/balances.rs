//! Balance read endpoints.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use api_types::balance::{BalanceResponse, BalancesResponse, GroupBalance};

use crate::{ServerError, server::ServerState, user};

pub async fn own_balance(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
) -> Result<Json<BalanceResponse>, ServerError> {
    let net_minor = state
        .engine
        .balance(&group_id, &user.username, &user.username)
        .await?;

    Ok(Json(BalanceResponse {
        group_id,
        user_id: user.username,
        net_minor,
    }))
}

pub async fn member_balance(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path((group_id, username)): Path<(String, String)>,
) -> Result<Json<BalanceResponse>, ServerError> {
    let net_minor = state
        .engine
        .balance(&group_id, &username, &user.username)
        .await?;

    Ok(Json(BalanceResponse {
        group_id,
        user_id: username,
        net_minor,
    }))
}

#[derive(Deserialize)]
pub struct BatchQuery {
    /// Comma-separated group ids.
    group_ids: String,
}

pub async fn batch(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<BatchQuery>,
) -> Result<Json<BalancesResponse>, ServerError> {
    let group_ids: Vec<String> = query
        .group_ids
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    if group_ids.is_empty() {
        return Err(ServerError::Generic(
            "group_ids must name at least one group".to_string(),
        ));
    }

    let nets = state.engine.balances(&group_ids, &user.username).await?;

    // Answer in request order rather than map order.
    let balances = group_ids
        .into_iter()
        .filter_map(|group_id| {
            nets.get(&group_id).map(|net| GroupBalance {
                group_id: group_id.clone(),
                net_minor: *net,
            })
        })
        .collect();

    Ok(Json(BalancesResponse { balances }))
}
