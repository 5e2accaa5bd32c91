use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Posts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Posts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Posts::Content).text().not_null())
                    .col(ColumnDef::new(Posts::AuthorId).big_integer())
                    .col(ColumnDef::new(Posts::ProjectId).big_integer())
                    .col(
                        ColumnDef::new(Posts::Hashtags)
                            .array(ColumnType::Text)
                            .not_null()
                            .default(Expr::cust("'{}'")),
                    )
                    .col(ColumnDef::new(Posts::Views).big_integer().not_null().default(0))
                    .col(ColumnDef::new(Posts::Published).boolean().not_null().default(false))
                    .col(ColumnDef::new(Posts::Deleted).boolean().not_null().default(false))
                    .col(ColumnDef::new(Posts::Verified).boolean().not_null().default(false))
                    .col(ColumnDef::new(Posts::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Posts::UpdatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Posts::PublishedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Posts::ScheduledAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Posts::VerifiedDate).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Exactly one owner reference per post.
        manager
            .get_connection()
            .execute_unprepared(
                "ALTER TABLE posts ADD CONSTRAINT posts_owner_check \
                 CHECK ((author_id IS NULL) <> (project_id IS NULL))",
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_posts_author_id")
                    .table(Posts::Table)
                    .col(Posts::AuthorId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_posts_project_id")
                    .table(Posts::Table)
                    .col(Posts::ProjectId)
                    .to_owned(),
            )
            .await?;
        manager
            .get_connection()
            .execute_unprepared("CREATE INDEX idx_posts_hashtags ON posts USING GIN (hashtags)")
            .await?;
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX idx_posts_ready_to_publish ON posts (scheduled_at) \
                 WHERE published = FALSE AND deleted = FALSE",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Posts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Posts {
    Table,
    Id,
    Content,
    AuthorId,
    ProjectId,
    Hashtags,
    Views,
    Published,
    Deleted,
    Verified,
    CreatedAt,
    UpdatedAt,
    PublishedAt,
    ScheduledAt,
    VerifiedDate,
}
