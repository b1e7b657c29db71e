//! Create group table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Group::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Group::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Group::ParentId).string_len(32))
                    .col(ColumnDef::new(Group::CreatorId).string_len(32).not_null())
                    .col(ColumnDef::new(Group::Name).string_len(250).not_null())
                    .col(ColumnDef::new(Group::Description).text())
                    .col(
                        ColumnDef::new(Group::ViewableBy)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Group::MembersInvitableBy)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Group::MaxSize).integer())
                    .col(
                        ColumnDef::new(Group::CannotContribute)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Group::BetaFeatures)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Group::SectorsMetric)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Group::MembershipsCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Group::ArchivedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Group::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Group::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_parent")
                            .from(Group::Table, Group::ParentId)
                            .to(Group::Table, Group::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_creator")
                            .from(Group::Table, Group::CreatorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_group_parent_id")
                    .table(Group::Table)
                    .col(Group::ParentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_group_archived_at")
                    .table(Group::Table)
                    .col(Group::ArchivedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Group::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Group {
    Table,
    Id,
    ParentId,
    CreatorId,
    Name,
    Description,
    ViewableBy,
    MembersInvitableBy,
    MaxSize,
    CannotContribute,
    BetaFeatures,
    SectorsMetric,
    MembershipsCount,
    ArchivedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
