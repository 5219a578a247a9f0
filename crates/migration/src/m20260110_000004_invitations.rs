use sea_orm_migration::prelude::*;

use crate::m20260110_000001_init::{Groups, Users};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
pub enum Invitations {
    Table,
    Id,
    GroupId,
    InviterId,
    InviteeEmail,
    Token,
    Status,
    CreatedAt,
    ExpiresAt,
    AcceptedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Invitations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Invitations::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Invitations::GroupId).string().not_null())
                    .col(ColumnDef::new(Invitations::InviterId).string().not_null())
                    .col(ColumnDef::new(Invitations::InviteeEmail).string().not_null())
                    .col(
                        ColumnDef::new(Invitations::Token)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Invitations::Status).string().not_null())
                    .col(
                        ColumnDef::new(Invitations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invitations::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Invitations::AcceptedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-invitations-group_id")
                            .from(Invitations::Table, Invitations::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-invitations-inviter_id")
                            .from(Invitations::Table, Invitations::InviterId)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Acceptance looks up by token; the invite screen lists by group.
        manager
            .create_index(
                Index::create()
                    .name("idx-invitations-group_id")
                    .table(Invitations::Table)
                    .col(Invitations::GroupId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx-invitations-invitee_email")
                    .table(Invitations::Table)
                    .col(Invitations::InviteeEmail)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Invitations::Table).to_owned())
            .await?;
        Ok(())
    }
}
