use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Assignments {
    Table,
    Id,
    EventId,
    GiverId,
    ReceiverId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Presents {
    Table,
    Id,
    AssignmentId,
    GiverId,
    ReceiverId,
    Status,
    Description,
    SubmittedAt,
    DeliveredAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Participants {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Events {
    Table,
    Id,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

/// 分配表与礼物表
/// - 每个活动中每个参与者恰好作为赠送者出现一次、作为接收者出现一次
///   (event_id, giver_id) 与 (event_id, receiver_id) 两个唯一索引在库层面保证
/// - 礼物与分配一一对应 (assignment_id 唯一)
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Assignments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Assignments::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Assignments::EventId).uuid().not_null())
                    .col(ColumnDef::new(Assignments::GiverId).uuid().not_null())
                    .col(ColumnDef::new(Assignments::ReceiverId).uuid().not_null())
                    .col(
                        ColumnDef::new(Assignments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_assignments_event")
                            .from(Assignments::Table, Assignments::EventId)
                            .to(Events::Table, Events::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_assignments_giver")
                            .from(Assignments::Table, Assignments::GiverId)
                            .to(Participants::Table, Participants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_assignments_receiver")
                            .from(Assignments::Table, Assignments::ReceiverId)
                            .to(Participants::Table, Participants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_assignments_event_giver")
                    .table(Assignments::Table)
                    .col(Assignments::EventId)
                    .col(Assignments::GiverId)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_assignments_event_receiver")
                    .table(Assignments::Table)
                    .col(Assignments::EventId)
                    .col(Assignments::ReceiverId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Presents::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Presents::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Presents::AssignmentId).uuid().not_null())
                    .col(ColumnDef::new(Presents::GiverId).uuid().not_null())
                    .col(ColumnDef::new(Presents::ReceiverId).uuid().not_null())
                    .col(
                        ColumnDef::new(Presents::Status)
                            .string_len(32)
                            .not_null()
                            .default("not_submitted"),
                    )
                    .col(ColumnDef::new(Presents::Description).text().null())
                    .col(
                        ColumnDef::new(Presents::SubmittedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Presents::DeliveredAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Presents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Presents::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_presents_assignment")
                            .from(Presents::Table, Presents::AssignmentId)
                            .to(Assignments::Table, Assignments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_presents_giver")
                            .from(Presents::Table, Presents::GiverId)
                            .to(Participants::Table, Participants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_presents_receiver")
                            .from(Presents::Table, Presents::ReceiverId)
                            .to(Participants::Table, Participants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_presents_assignment")
                    .table(Presents::Table)
                    .col(Presents::AssignmentId)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_presents_giver_id")
                    .table(Presents::Table)
                    .col(Presents::GiverId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Presents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Assignments::Table).to_owned())
            .await?;
        Ok(())
    }
}
