//! Create discussion, comment, and `discussion_reader` tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Discussion::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Discussion::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Discussion::GroupId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Discussion::AuthorId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Discussion::Title).string_len(250).not_null())
                    .col(
                        ColumnDef::new(Discussion::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Discussion::LastCommentAt)
                            .timestamp_with_time_zone(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_discussion_group")
                            .from(Discussion::Table, Discussion::GroupId)
                            .to(Group::Table, Group::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_discussion_author")
                            .from(Discussion::Table, Discussion::AuthorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_discussion_group_created_at")
                    .table(Discussion::Table)
                    .col(Discussion::GroupId)
                    .col(Discussion::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Comment::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Comment::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Comment::DiscussionId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Comment::AuthorId).string_len(32).not_null())
                    .col(ColumnDef::new(Comment::Body).text().not_null())
                    .col(
                        ColumnDef::new(Comment::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_discussion")
                            .from(Comment::Table, Comment::DiscussionId)
                            .to(Discussion::Table, Discussion::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_author")
                            .from(Comment::Table, Comment::AuthorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_comment_discussion_created_at")
                    .table(Comment::Table)
                    .col(Comment::DiscussionId)
                    .col(Comment::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DiscussionReader::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DiscussionReader::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DiscussionReader::DiscussionId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DiscussionReader::UserId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DiscussionReader::LastViewedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DiscussionReader::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_discussion_reader_discussion")
                            .from(DiscussionReader::Table, DiscussionReader::DiscussionId)
                            .to(Discussion::Table, Discussion::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_discussion_reader_user")
                            .from(DiscussionReader::Table, DiscussionReader::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One read-log row per (discussion, user)
        manager
            .create_index(
                Index::create()
                    .name("idx_discussion_reader_unique")
                    .table(DiscussionReader::Table)
                    .col(DiscussionReader::DiscussionId)
                    .col(DiscussionReader::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_discussion_reader_user_id")
                    .table(DiscussionReader::Table)
                    .col(DiscussionReader::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DiscussionReader::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Comment::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Discussion::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Discussion {
    Table,
    Id,
    GroupId,
    AuthorId,
    Title,
    CreatedAt,
    LastCommentAt,
}

#[derive(Iden)]
enum Comment {
    Table,
    Id,
    DiscussionId,
    AuthorId,
    Body,
    CreatedAt,
}

#[derive(Iden)]
enum DiscussionReader {
    Table,
    Id,
    DiscussionId,
    UserId,
    LastViewedAt,
    CreatedAt,
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
