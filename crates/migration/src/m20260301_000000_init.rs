//! Initial schema migration - creates all tables from scratch.
//!
//! It creates the complete schema for Kameti:
//!
//! - `users`: authentication
//! - `members`: fund participants with denormalized contribution counters
//! - `payments`: append-only contribution records with approval state
//! - `payout_slots`: one row per rotation month

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    Password,
    Name,
    Email,
    IsAdmin,
}

#[derive(Iden)]
enum Members {
    Table,
    Id,
    Name,
    Email,
    Uid,
    IsVerified,
    TotalContributedMinor,
    PaidDates,
    PayoutStatus,
    PayoutMonth,
    PayoutAmountMinor,
    JoinedAt,
}

#[derive(Iden)]
enum Payments {
    Table,
    Id,
    MemberId,
    Date,
    AmountMinor,
    Status,
    RequestedBy,
    CreatedAt,
    ApprovedBy,
    ApprovedAt,
    RejectedBy,
    RejectedAt,
    CancelledBy,
    CancelledAt,
}

#[derive(Iden)]
enum PayoutSlots {
    Table,
    Id,
    MemberId,
    Month,
    AmountMinor,
    Status,
    SelectedBy,
    SelectedAt,
    CompletedBy,
    CompletedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
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
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(ColumnDef::new(Users::Email).string().not_null())
                    .col(
                        ColumnDef::new(Users::IsAdmin)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Members
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Members::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Members::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Members::Name).string().not_null())
                    .col(ColumnDef::new(Members::Email).string().not_null())
                    .col(ColumnDef::new(Members::Uid).string())
                    .col(ColumnDef::new(Members::IsVerified).boolean().not_null())
                    .col(
                        ColumnDef::new(Members::TotalContributedMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Members::PaidDates).string().not_null())
                    .col(ColumnDef::new(Members::PayoutStatus).string().not_null())
                    .col(ColumnDef::new(Members::PayoutMonth).integer())
                    .col(ColumnDef::new(Members::PayoutAmountMinor).big_integer())
                    .col(ColumnDef::new(Members::JoinedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-members-email-unique")
                    .table(Members::Table)
                    .col(Members::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-members-uid")
                    .table(Members::Table)
                    .col(Members::Uid)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Payments
        //
        // No foreign key to members: payment rows outlive a removed member
        // on purpose, they are the audit trail.
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Payments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Payments::MemberId).string().not_null())
                    .col(ColumnDef::new(Payments::Date).date().not_null())
                    .col(
                        ColumnDef::new(Payments::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payments::Status).string().not_null())
                    .col(ColumnDef::new(Payments::RequestedBy).string().not_null())
                    .col(ColumnDef::new(Payments::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Payments::ApprovedBy).string())
                    .col(ColumnDef::new(Payments::ApprovedAt).timestamp())
                    .col(ColumnDef::new(Payments::RejectedBy).string())
                    .col(ColumnDef::new(Payments::RejectedAt).timestamp())
                    .col(ColumnDef::new(Payments::CancelledBy).string())
                    .col(ColumnDef::new(Payments::CancelledAt).timestamp())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-payments-member_id-date")
                    .table(Payments::Table)
                    .col(Payments::MemberId)
                    .col(Payments::Date)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-payments-status")
                    .table(Payments::Table)
                    .col(Payments::Status)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Payout slots
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(PayoutSlots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PayoutSlots::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PayoutSlots::MemberId).string().not_null())
                    .col(ColumnDef::new(PayoutSlots::Month).integer().not_null())
                    .col(
                        ColumnDef::new(PayoutSlots::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PayoutSlots::Status).string().not_null())
                    .col(ColumnDef::new(PayoutSlots::SelectedBy).string().not_null())
                    .col(
                        ColumnDef::new(PayoutSlots::SelectedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PayoutSlots::CompletedBy).string())
                    .col(ColumnDef::new(PayoutSlots::CompletedAt).timestamp())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-payout_slots-month-unique")
                    .table(PayoutSlots::Table)
                    .col(PayoutSlots::Month)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-payout_slots-member_id-unique")
                    .table(PayoutSlots::Table)
                    .col(PayoutSlots::MemberId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PayoutSlots::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Members::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
