//! Create review table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Review::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Review::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Review::PlaceId).string_len(32).not_null())
                    .col(ColumnDef::new(Review::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Review::Rating)
                            .small_integer()
                            .not_null()
                            .check(Expr::col(Review::Rating).between(1, 5)),
                    )
                    .col(ColumnDef::new(Review::Title).string_len(256))
                    .col(ColumnDef::new(Review::Comment).text())
                    .col(
                        ColumnDef::new(Review::HelpfulUsers)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(Review::HelpfulCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Review::IsActive).boolean().not_null().default(true))
                    .col(
                        ColumnDef::new(Review::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Review::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_place")
                            .from(Review::Table, Review::PlaceId)
                            .to(Place::Table, Place::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (place_id, user_id) - one review per user per place
        manager
            .create_index(
                Index::create()
                    .name("idx_review_place_user")
                    .table(Review::Table)
                    .col(Review::PlaceId)
                    .col(Review::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (place_id, created_at) for recent reviews of a place
        manager
            .create_index(
                Index::create()
                    .name("idx_review_place_created_at")
                    .table(Review::Table)
                    .col(Review::PlaceId)
                    .col(Review::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Review::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Review {
    Table,
    Id,
    PlaceId,
    UserId,
    Rating,
    Title,
    Comment,
    HelpfulUsers,
    HelpfulCount,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Place {
    Table,
    Id,
}
