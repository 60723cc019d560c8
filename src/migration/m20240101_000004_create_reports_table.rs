use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Reports {
    Table,
    Id,
    ReporterId,
    TargetType,
    TargetId,
    Reason,
    Description,
    Evidence,
    Priority,
    Status,
    ModeratorId,
    ModeratorNotes,
    Action,
    ActionTakenAt,
    ActionExpiresAt,
    TargetData,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reports::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Reports::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Reports::ReporterId).integer().not_null())
                    .col(
                        ColumnDef::new(Reports::TargetType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Reports::TargetId).integer().not_null())
                    .col(ColumnDef::new(Reports::Reason).string_len(30).not_null())
                    .col(ColumnDef::new(Reports::Description).text().null())
                    .col(ColumnDef::new(Reports::Evidence).json().not_null())
                    .col(ColumnDef::new(Reports::Priority).string_len(10).not_null())
                    .col(
                        ColumnDef::new(Reports::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Reports::ModeratorId).integer().null())
                    .col(ColumnDef::new(Reports::ModeratorNotes).text().null())
                    .col(
                        ColumnDef::new(Reports::Action)
                            .string_len(20)
                            .not_null()
                            .default("none"),
                    )
                    .col(ColumnDef::new(Reports::ActionTakenAt).timestamp().null())
                    .col(ColumnDef::new(Reports::ActionExpiresAt).timestamp().null())
                    .col(ColumnDef::new(Reports::TargetData).json().not_null())
                    .col(
                        ColumnDef::new(Reports::Version)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Reports::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Reports::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reports_reporter_id")
                            .from(Reports::Table, Reports::ReporterId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reports_moderator_id")
                            .from(Reports::Table, Reports::ModeratorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reports_status_priority")
                    .table(Reports::Table)
                    .col(Reports::Status)
                    .col(Reports::Priority)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reports_target")
                    .table(Reports::Table)
                    .col(Reports::TargetType)
                    .col(Reports::TargetId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reports_reporter_id")
                    .table(Reports::Table)
                    .col(Reports::ReporterId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // One open report per reporter and target. Terminal reports fall out of
        // the index so the same target can be reported again later.
        let db = manager.get_connection();
        db.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_reports_active_unique \
             ON reports (reporter_id, target_type, target_id) \
             WHERE status IN ('pending', 'investigating')",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reports::Table).to_owned())
            .await
    }
}
