//! Invitation lifecycle: pending → accepted, with expiry computed at read
//! time and acceptance idempotent under races.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use sea_orm::{
    ActiveValue, DbErr, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::OnConflict,
};
use uuid::Uuid;

use crate::{
    EngineError, Invitation, InvitationStatus, ResultEngine, group_members, invitations,
};

use super::{Engine, access::MemberRole, normalize_email, with_tx};

/// How long a new invitation stays acceptable.
const INVITATION_TTL_DAYS: i64 = 7;

/// Unguessable URL-safe token: 32 bytes of v4-uuid randomness.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    bytes[..16].copy_from_slice(Uuid::new_v4().as_bytes());
    bytes[16..].copy_from_slice(Uuid::new_v4().as_bytes());
    URL_SAFE_NO_PAD.encode(bytes)
}

impl Engine {
    /// Invites an email address into a group (admin-only).
    ///
    /// Re-inviting an address with an invitation still pending is allowed
    /// and mints a second independent token; the two coexist and either can
    /// be accepted.
    pub async fn create_invitation(
        &self,
        group_id: &str,
        invitee_email: &str,
        user_id: &str,
    ) -> ResultEngine<Invitation> {
        let email = normalize_email(invitee_email)?;
        with_tx!(self, |db_tx| {
            self.require_group_admin(&db_tx, group_id, user_id).await?;

            let now = Utc::now();
            let model = invitations::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4().to_string()),
                group_id: ActiveValue::Set(group_id.to_string()),
                inviter_id: ActiveValue::Set(user_id.to_string()),
                invitee_email: ActiveValue::Set(email.clone()),
                token: ActiveValue::Set(generate_token()),
                status: ActiveValue::Set(InvitationStatus::Pending.as_str().to_string()),
                created_at: ActiveValue::Set(now),
                expires_at: ActiveValue::Set(now + Duration::days(INVITATION_TTL_DAYS)),
                accepted_at: ActiveValue::Set(None),
            }
            .insert(&db_tx)
            .await?;

            Invitation::try_from(model)
        })
    }

    /// Redeems an invitation token for a group membership.
    ///
    /// Wrong token, wrong email, already accepted and expired all surface
    /// as the same [`EngineError::InvalidToken`] so the failure mode leaks
    /// nothing to an enumerating caller. The membership insert is a no-op
    /// on conflict: the (group_id, user_id) uniqueness constraint is what
    /// serializes two concurrent accepts of the same token, so a double
    /// accept never produces a second membership row.
    pub async fn accept_invitation(&self, token: &str, user_id: &str) -> ResultEngine<String> {
        with_tx!(self, |db_tx| {
            let user = self.require_user_exists(&db_tx, user_id).await?;
            let Some(email) = user.email.as_deref() else {
                return Err(EngineError::Forbidden(
                    "a verified email is required to accept invitations".to_string(),
                ));
            };
            let email = normalize_email(email)?;

            let now = Utc::now();
            let invitation = invitations::Entity::find()
                .filter(invitations::Column::Token.eq(token.to_string()))
                .filter(
                    invitations::Column::Status.eq(InvitationStatus::Pending.as_str().to_string()),
                )
                .filter(invitations::Column::InviteeEmail.eq(email))
                .one(&db_tx)
                .await?
                .filter(|inv| !inv.is_expired(now))
                .ok_or(EngineError::InvalidToken)?;

            let member = group_members::ActiveModel {
                group_id: ActiveValue::Set(invitation.group_id.clone()),
                user_id: ActiveValue::Set(user_id.to_string()),
                role: ActiveValue::Set(MemberRole::Member.as_str().to_string()),
                joined_at: ActiveValue::Set(now),
            };
            let insert = group_members::Entity::insert(member)
                .on_conflict(
                    OnConflict::columns([
                        group_members::Column::GroupId,
                        group_members::Column::UserId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec(&db_tx)
                .await;
            match insert {
                Ok(_) => {}
                // Membership already exists; accepting again is harmless.
                Err(DbErr::RecordNotInserted) => {}
                Err(err) => return Err(err.into()),
            }

            invitations::ActiveModel {
                id: ActiveValue::Set(invitation.id.clone()),
                status: ActiveValue::Set(InvitationStatus::Accepted.as_str().to_string()),
                accepted_at: ActiveValue::Set(Some(now)),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;

            Ok(invitation.group_id)
        })
    }

    /// Revokes a pending invitation by deleting its row (admin-only).
    pub async fn cancel_invitation(
        &self,
        group_id: &str,
        invitation_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_group_admin(&db_tx, group_id, user_id).await?;

            let invitation = invitations::Entity::find_by_id(invitation_id.to_string())
                .filter(invitations::Column::GroupId.eq(group_id.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| {
                    EngineError::KeyNotFound("invitation not exists".to_string())
                })?;
            if invitation.status == InvitationStatus::Accepted.as_str() {
                return Err(EngineError::ExistingKey(
                    "invitation already accepted".to_string(),
                ));
            }

            invitations::Entity::delete_by_id(invitation.id)
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }

    /// Lists a group's invitations (admin-only). Pending rows past their
    /// expiry are reported with the computed `expired` status.
    pub async fn list_group_invitations(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<Invitation>> {
        with_tx!(self, |db_tx| {
            self.require_group_admin(&db_tx, group_id, user_id).await?;

            let rows = invitations::Entity::find()
                .filter(invitations::Column::GroupId.eq(group_id.to_string()))
                .order_by_asc(invitations::Column::CreatedAt)
                .order_by_asc(invitations::Column::Id)
                .all(&db_tx)
                .await?;

            let now = Utc::now();
            let mut out = Vec::with_capacity(rows.len());
            for row in rows {
                let mut invitation = Invitation::try_from(row)?;
                invitation.status = invitation.status_at(now);
                out.push(invitation);
            }
            Ok(out)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_url_safe() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn token_encodes_32_bytes() {
        assert_eq!(generate_token().len(), 43);
    }
}
