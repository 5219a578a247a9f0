use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{Group, ResultEngine, group_members, groups};

use super::{Engine, access::MemberRole, normalize_required_name, with_tx};

impl Engine {
    /// Creates a group and the creator's `admin` membership row, which is
    /// the root of all further authorization in the group.
    pub async fn new_group(&self, name: &str, user_id: &str) -> ResultEngine<String> {
        let name = normalize_required_name(name, "group")?;
        with_tx!(self, |db_tx| {
            self.require_user_exists(&db_tx, user_id).await?;

            let group_id = Uuid::new_v4().to_string();
            let now = Utc::now();
            groups::ActiveModel {
                id: ActiveValue::Set(group_id.clone()),
                name: ActiveValue::Set(name.clone()),
                created_by: ActiveValue::Set(user_id.to_string()),
                created_at: ActiveValue::Set(now),
            }
            .insert(&db_tx)
            .await?;

            group_members::ActiveModel {
                group_id: ActiveValue::Set(group_id.clone()),
                user_id: ActiveValue::Set(user_id.to_string()),
                role: ActiveValue::Set(MemberRole::Admin.as_str().to_string()),
                joined_at: ActiveValue::Set(now),
            }
            .insert(&db_tx)
            .await?;

            Ok(group_id)
        })
    }

    /// Lists the groups the user belongs to, oldest membership first.
    pub async fn list_groups(&self, user_id: &str) -> ResultEngine<Vec<Group>> {
        with_tx!(self, |db_tx| {
            let memberships = group_members::Entity::find()
                .filter(group_members::Column::UserId.eq(user_id.to_string()))
                .order_by_asc(group_members::Column::JoinedAt)
                .order_by_asc(group_members::Column::GroupId)
                .all(&db_tx)
                .await?;

            let mut out = Vec::with_capacity(memberships.len());
            for membership in memberships {
                if let Some(model) = groups::Entity::find_by_id(membership.group_id)
                    .one(&db_tx)
                    .await?
                {
                    out.push(Group::try_from(model)?);
                }
            }
            Ok(out)
        })
    }
}
