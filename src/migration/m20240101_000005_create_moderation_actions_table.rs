use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum ModerationActions {
    Table,
    Id,
    ActionType,
    TargetType,
    TargetId,
    SubjectUserId,
    ReportId,
    ModeratorId,
    Reason,
    Notes,
    ExpiresAt,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Reports {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ModerationActions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ModerationActions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ModerationActions::ActionType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ModerationActions::TargetType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ModerationActions::TargetId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ModerationActions::SubjectUserId)
                            .integer()
                            .null(),
                    )
                    .col(ColumnDef::new(ModerationActions::ReportId).integer().null())
                    .col(
                        ColumnDef::new(ModerationActions::ModeratorId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ModerationActions::Reason).text().not_null())
                    .col(ColumnDef::new(ModerationActions::Notes).text().null())
                    .col(
                        ColumnDef::new(ModerationActions::ExpiresAt)
                            .timestamp()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ModerationActions::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ModerationActions::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    // Audit rows are never cascaded away with the moderator or report.
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_moderation_actions_moderator_id")
                            .from(ModerationActions::Table, ModerationActions::ModeratorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_moderation_actions_report_id")
                            .from(ModerationActions::Table, ModerationActions::ReportId)
                            .to(Reports::Table, Reports::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_moderation_actions_target")
                    .table(ModerationActions::Table)
                    .col(ModerationActions::TargetType)
                    .col(ModerationActions::TargetId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // The expiry sweeper scans active rows by expiry.
        manager
            .create_index(
                Index::create()
                    .name("idx_moderation_actions_expiry")
                    .table(ModerationActions::Table)
                    .col(ModerationActions::IsActive)
                    .col(ModerationActions::ExpiresAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ModerationActions::Table).to_owned())
            .await
    }
}
