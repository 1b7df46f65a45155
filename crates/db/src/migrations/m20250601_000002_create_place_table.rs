//! Create place table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Place::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Place::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Place::Name).string_len(256).not_null())
                    .col(ColumnDef::new(Place::Description).text())
                    .col(ColumnDef::new(Place::Category).string_len(32).not_null())
                    .col(ColumnDef::new(Place::Subcategory).string_len(128))
                    .col(ColumnDef::new(Place::AddressStreet).string_len(512))
                    .col(ColumnDef::new(Place::AddressCity).string_len(256))
                    .col(
                        ColumnDef::new(Place::Lat)
                            .double()
                            .not_null()
                            .check(Expr::col(Place::Lat).between(-90.0, 90.0)),
                    )
                    .col(
                        ColumnDef::new(Place::Lng)
                            .double()
                            .not_null()
                            .check(Expr::col(Place::Lng).between(-180.0, 180.0)),
                    )
                    .col(
                        ColumnDef::new(Place::MinPrice)
                            .double()
                            .not_null()
                            .default(0.0)
                            .check(Expr::col(Place::MinPrice).gte(0.0)),
                    )
                    .col(
                        ColumnDef::new(Place::MaxPrice)
                            .double()
                            .not_null()
                            .default(0.0)
                            .check(Expr::col(Place::MaxPrice).gte(0.0)),
                    )
                    .col(
                        ColumnDef::new(Place::RatingAverage)
                            .double()
                            .not_null()
                            .default(0.0)
                            .check(Expr::col(Place::RatingAverage).between(0.0, 5.0)),
                    )
                    .col(
                        ColumnDef::new(Place::RatingCount)
                            .integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Place::RatingCount).gte(0)),
                    )
                    .col(ColumnDef::new(Place::Wifi).boolean().not_null().default(false))
                    .col(ColumnDef::new(Place::Parking).boolean().not_null().default(false))
                    .col(
                        ColumnDef::new(Place::AirConditioning)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Place::Outdoor).boolean().not_null().default(false))
                    .col(ColumnDef::new(Place::PetFriendly).boolean().not_null().default(false))
                    .col(ColumnDef::new(Place::Delivery).boolean().not_null().default(false))
                    .col(ColumnDef::new(Place::Takeaway).boolean().not_null().default(false))
                    .col(ColumnDef::new(Place::CardPayment).boolean().not_null().default(false))
                    .col(
                        ColumnDef::new(Place::Tags)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(ColumnDef::new(Place::IsActive).boolean().not_null().default(true))
                    // No foreign key: a place outlives its owner's account
                    .col(ColumnDef::new(Place::CreatedBy).string_len(32).not_null())
                    .col(ColumnDef::new(Place::ViewCount).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Place::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Place::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Index: (category, subcategory)
        manager
            .create_index(
                Index::create()
                    .name("idx_place_category_subcategory")
                    .table(Place::Table)
                    .col(Place::Category)
                    .col(Place::Subcategory)
                    .to_owned(),
            )
            .await?;

        // Index: created_by (owner's places)
        manager
            .create_index(
                Index::create()
                    .name("idx_place_created_by")
                    .table(Place::Table)
                    .col(Place::CreatedBy)
                    .to_owned(),
            )
            .await?;

        // Index: rating_average (rating filter and sort)
        manager
            .create_index(
                Index::create()
                    .name("idx_place_rating_average")
                    .table(Place::Table)
                    .col(Place::RatingAverage)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Place::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Place {
    Table,
    Id,
    Name,
    Description,
    Category,
    Subcategory,
    AddressStreet,
    AddressCity,
    Lat,
    Lng,
    MinPrice,
    MaxPrice,
    RatingAverage,
    RatingCount,
    Wifi,
    Parking,
    AirConditioning,
    Outdoor,
    PetFriendly,
    Delivery,
    Takeaway,
    CardPayment,
    Tags,
    IsActive,
    CreatedBy,
    ViewCount,
    CreatedAt,
    UpdatedAt,
}
