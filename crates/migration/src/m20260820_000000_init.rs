//! Initial schema migration.
//!
//! - `users`: bearer-token authentication plus per-user forcing preferences
//! - `calculator_history`: synced calculation records, one row per entry

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Users {
    Table,
    Username,
    Token,
    ForcedNumber,
    SecondForceNumber,
    SecondForceTriggerNumber,
}

#[derive(Iden)]
enum CalculatorHistory {
    Table,
    Id,
    Username,
    Expression,
    ActualResult,
    ForcedResult,
    Result,
    WasForced,
    OperationType,
    DeviceId,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Token).string().not_null())
                    .col(ColumnDef::new(Users::ForcedNumber).double())
                    .col(ColumnDef::new(Users::SecondForceNumber).double())
                    .col(ColumnDef::new(Users::SecondForceTriggerNumber).double())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-users-token-unique")
                    .table(Users::Table)
                    .col(Users::Token)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CalculatorHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CalculatorHistory::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CalculatorHistory::Username)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CalculatorHistory::Expression)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CalculatorHistory::ActualResult)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CalculatorHistory::ForcedResult).double())
                    .col(
                        ColumnDef::new(CalculatorHistory::Result)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CalculatorHistory::WasForced)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CalculatorHistory::OperationType)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CalculatorHistory::DeviceId).string())
                    .col(
                        ColumnDef::new(CalculatorHistory::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-calculator_history-username")
                            .from(CalculatorHistory::Table, CalculatorHistory::Username)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-calculator_history-username-created_at")
                    .table(CalculatorHistory::Table)
                    .col(CalculatorHistory::Username)
                    .col(CalculatorHistory::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CalculatorHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
