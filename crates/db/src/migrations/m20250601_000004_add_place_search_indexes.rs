//! Add geospatial and full-text search indexes for places.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Bounding-box prefilter for proximity search, active places only
        manager
            .get_connection()
            .execute_unprepared(
                r"
                CREATE INDEX IF NOT EXISTS idx_place_lat_lng_active
                ON place (lat, lng)
                WHERE is_active = true;
                ",
            )
            .await?;

        // GIN index for place text search (name + description + tags).
        // Must stay in sync with the expression used by the pipeline compiler.
        manager
            .get_connection()
            .execute_unprepared(
                r"
                CREATE INDEX IF NOT EXISTS idx_place_text_search
                ON place
                USING GIN (
                    to_tsvector(
                        'simple',
                        COALESCE(name, '') || ' ' || COALESCE(description, '') || ' ' || COALESCE(tags::text, '')
                    )
                );
                ",
            )
            .await?;

        // Index for the default listing order
        manager
            .get_connection()
            .execute_unprepared(
                r"
                CREATE INDEX IF NOT EXISTS idx_place_active_created_at
                ON place (created_at DESC, id)
                WHERE is_active = true;
                ",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP INDEX IF EXISTS idx_place_lat_lng_active;")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP INDEX IF EXISTS idx_place_text_search;")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP INDEX IF EXISTS idx_place_active_created_at;")
            .await?;

        Ok(())
    }
}
