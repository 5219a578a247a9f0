use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{EngineError, GroupMember, ResultEngine, group_members};

use super::{Engine, access::MemberRole, with_tx};

impl Engine {
    /// Adds a member directly or updates their role (admin-only).
    ///
    /// The creator's row cannot be touched through this call; their admin
    /// membership is the root of the group's authorization.
    pub async fn add_group_member(
        &self,
        group_id: &str,
        member_username: &str,
        role: &str,
        user_id: &str,
    ) -> ResultEngine<()> {
        let role = MemberRole::try_from(role)?;
        with_tx!(self, |db_tx| {
            let group = self.require_group_admin(&db_tx, group_id, user_id).await?;
            self.require_user_exists(&db_tx, member_username).await?;

            if member_username == group.created_by {
                return Err(EngineError::Forbidden(
                    "cannot change the group creator's membership".to_string(),
                ));
            }

            let active = group_members::ActiveModel {
                group_id: ActiveValue::Set(group_id.to_string()),
                user_id: ActiveValue::Set(member_username.to_string()),
                role: ActiveValue::Set(role.as_str().to_string()),
                joined_at: ActiveValue::Set(Utc::now()),
            };

            // Upsert: insert if missing, otherwise update role.
            match group_members::Entity::find_by_id((
                group_id.to_string(),
                member_username.to_string(),
            ))
            .one(&db_tx)
            .await?
            {
                Some(existing) => {
                    let mut active = active;
                    active.joined_at = ActiveValue::Set(existing.joined_at);
                    active.update(&db_tx).await?;
                }
                None => {
                    active.insert(&db_tx).await?;
                }
            }

            Ok(())
        })
    }

    /// Removes a member: admins can kick, anyone can leave. The creator
    /// cannot be removed.
    pub async fn remove_group_member(
        &self,
        group_id: &str,
        member_username: &str,
        user_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let group = self.require_group_member(&db_tx, group_id, user_id).await?;

            if member_username == group.created_by {
                return Err(EngineError::Forbidden(
                    "cannot remove the group creator".to_string(),
                ));
            }
            if member_username != user_id {
                self.require_group_admin(&db_tx, group_id, user_id).await?;
            }

            group_members::Entity::delete_by_id((
                group_id.to_string(),
                member_username.to_string(),
            ))
            .exec(&db_tx)
            .await?;

            Ok(())
        })
    }

    /// Lists members in join order (any member may list).
    pub async fn list_group_members(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<GroupMember>> {
        with_tx!(self, |db_tx| {
            self.require_group_member(&db_tx, group_id, user_id).await?;

            let rows = group_members::Entity::find()
                .filter(group_members::Column::GroupId.eq(group_id.to_string()))
                .order_by_asc(group_members::Column::JoinedAt)
                .order_by_asc(group_members::Column::UserId)
                .all(&db_tx)
                .await?;
            Ok(rows.into_iter().map(GroupMember::from).collect())
        })
    }
}
