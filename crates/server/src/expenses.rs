//! Expense endpoints.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use api_types::expense::{ExpenseCreated, ExpenseNew, ExpenseView, ExpensesResponse, SplitView};

use crate::{ServerError, server::ServerState, user};

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<ExpenseCreated>), ServerError> {
    let payer = payload.payer_id.as_deref().unwrap_or(&user.username);
    let splits: Vec<(String, i64)> = payload
        .splits
        .into_iter()
        .map(|split| (split.user_id, split.amount_minor))
        .collect();

    let id = state
        .engine
        .new_expense(
            &group_id,
            payer,
            payload.amount_minor,
            payload.description.as_deref(),
            &splits,
            &user.username,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ExpenseCreated { id })))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
) -> Result<Json<ExpensesResponse>, ServerError> {
    let expenses = state
        .engine
        .list_group_expenses(&group_id, &user.username)
        .await?
        .into_iter()
        .map(|expense| ExpenseView {
            id: expense.id,
            payer_id: expense.payer_id,
            amount_minor: expense.amount_minor,
            description: expense.description,
            created_at: expense.created_at,
            splits: expense
                .splits
                .into_iter()
                .map(|split| SplitView {
                    id: split.id,
                    user_id: split.user_id,
                    amount_minor: split.amount_minor,
                    is_settled: split.is_settled,
                    settled_at: split.settled_at,
                })
                .collect(),
        })
        .collect();

    Ok(Json(ExpensesResponse { expenses }))
}
