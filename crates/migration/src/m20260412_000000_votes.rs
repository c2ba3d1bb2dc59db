//! Adds the `votes` table: one advisory vote per authenticated user.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Votes {
    Table,
    VoterUid,
    CandidateMemberId,
    UpdatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Votes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Votes::VoterUid)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    // NULL means the voter explicitly withdrew their vote.
                    .col(ColumnDef::new(Votes::CandidateMemberId).string())
                    .col(ColumnDef::new(Votes::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Votes::Table).to_owned())
            .await
    }
}
