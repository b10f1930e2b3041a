use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notifications::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Notifications::EventId).uuid().not_null())
                    .col(ColumnDef::new(Notifications::OrderId).uuid().not_null())
                    .col(ColumnDef::new(Notifications::Email).string_len(200).not_null())
                    .col(
                        ColumnDef::new(Notifications::Type)
                            .string_len(32)
                            .not_null()
                            .default("ORDER_CREATED"),
                    )
                    .col(
                        ColumnDef::new(Notifications::Delivered)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Notifications::ErrorMessage).string())
                    .col(
                        ColumnDef::new(Notifications::Payload)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Notifications::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Final arbiter of concurrent deliveries of the same event.
        manager
            .create_index(
                Index::create()
                    .table(Notifications::Table)
                    .col(Notifications::EventId)
                    .name("idx_notifications_event_id")
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Notifications::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Notifications {
    Table,
    Id,
    EventId,
    OrderId,
    Email,
    Type,
    Delivered,
    ErrorMessage,
    Payload,
    CreatedAt,
}
