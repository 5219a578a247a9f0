//! Settlement audit records and the executor's result types.
//!
//! A `Settlement` row records a transfer event that retired one or more
//! splits. The table is append-only; the amount is always the sum of the
//! splits the settlement actually flipped, not the requested amount.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "settlements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub payer_id: String,
    pub receiver_id: String,
    pub amount_minor: i64,
    pub description: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Groups,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: Uuid,
    pub group_id: String,
    pub payer_id: String,
    pub receiver_id: String,
    pub amount_minor: i64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<Model> for Settlement {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("settlement not exists".to_string()))?,
            group_id: model.group_id,
            payer_id: model.payer_id,
            receiver_id: model.receiver_id,
            amount_minor: model.amount_minor,
            description: model.description,
            created_at: model.created_at,
        })
    }
}

/// One advisory transfer proposed by the planner: `from` pays `to`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedTransfer {
    pub from: String,
    pub to: String,
    pub amount_minor: i64,
}

/// Result of a `settle` call.
///
/// `remaining_minor > 0` is a benign outcome: there was less settleable
/// debt than requested, not a fault.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementOutcome {
    /// Id of the audit record, when one was written.
    pub settlement_id: Option<Uuid>,
    pub settled_split_ids: Vec<Uuid>,
    pub settled_minor: i64,
    pub remaining_minor: i64,
}
