//! Create membership table.
//!
//! The unique index on (`group_id`, `user_id`) is the serialization point for
//! concurrent membership creation: a losing insert surfaces as
//! `DuplicateMembership` and the caller retries as lookup-then-transition.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Membership::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Membership::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Membership::GroupId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Membership::UserId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Membership::AccessLevel)
                            .string_len(20)
                            .not_null()
                            .default("request"),
                    )
                    .col(ColumnDef::new(Membership::InvitationToken).string_len(64))
                    .col(ColumnDef::new(Membership::InviterId).string_len(32))
                    .col(
                        ColumnDef::new(Membership::GroupLastViewedAt)
                            .timestamp_with_time_zone(),
                    )
                    .col(
                        ColumnDef::new(Membership::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Membership::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_membership_group")
                            .from(Membership::Table, Membership::GroupId)
                            .to(Group::Table, Group::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_membership_user")
                            .from(Membership::Table, Membership::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_membership_inviter")
                            .from(Membership::Table, Membership::InviterId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // At most one membership per (group, user)
        manager
            .create_index(
                Index::create()
                    .name("idx_membership_group_user_unique")
                    .table(Membership::Table)
                    .col(Membership::GroupId)
                    .col(Membership::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_membership_user_id")
                    .table(Membership::Table)
                    .col(Membership::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_membership_invitation_token")
                    .table(Membership::Table)
                    .col(Membership::InvitationToken)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Membership::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Membership {
    Table,
    Id,
    GroupId,
    UserId,
    AccessLevel,
    InvitationToken,
    InviterId,
    GroupLastViewedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Group {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
