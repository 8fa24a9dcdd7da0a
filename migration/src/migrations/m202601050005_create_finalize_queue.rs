use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202601050005_create_finalize_queue"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Durable schedule of pending finalizations. One row per token,
        // written at issuance and polled by the background worker, so a
        // process restart cannot lose a pending sweep.
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("finalize_queue"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("token_id"))
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("due_at")).timestamp().not_null())
                    .col(
                        ColumnDef::new(Alias::new("completed_at"))
                            .timestamp()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("attempts"))
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Alias::new("last_error")).string().null())
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp()
                            .not_null()
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .col(
                        ColumnDef::new(Alias::new("updated_at"))
                            .timestamp()
                            .not_null()
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_finalize_queue_token")
                            .from(Alias::new("finalize_queue"), Alias::new("token_id"))
                            .to(Alias::new("qr_tokens"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_finalize_queue_due")
                    .table(Alias::new("finalize_queue"))
                    .col(Alias::new("due_at"))
                    .col(Alias::new("completed_at"))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("finalize_queue")).to_owned())
            .await
    }
}
