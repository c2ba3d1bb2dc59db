//! Payment primitives.
//!
//! A `Payment` is one contribution claim for a `(member, date)` slot and
//! carries the full approval state machine. Rows are append-only: rejected
//! and cancelled records stay around for audit, and a fresh claim for the
//! same slot creates a new row.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LedgerError, ResultLedger};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(LedgerError::InvalidState(format!(
                "invalid payment status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub member_id: Uuid,
    pub date: NaiveDate,
    pub amount_minor: i64,
    pub status: PaymentStatus,
    pub requested_by: String,
    pub created_at: DateTime<Utc>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<String>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub fn new(
        member_id: Uuid,
        date: NaiveDate,
        amount_minor: i64,
        status: PaymentStatus,
        requested_by: String,
        created_at: DateTime<Utc>,
    ) -> ResultLedger<Self> {
        if amount_minor <= 0 {
            return Err(LedgerError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            member_id,
            date,
            amount_minor,
            status,
            requested_by,
            created_at,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            cancelled_by: None,
            cancelled_at: None,
        })
    }
}

/// Result of `mark_payment`, so callers can render the outcome without a
/// second read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarkOutcome {
    pub payment_id: Uuid,
    pub status: PaymentStatus,
}

/// Admin-facing projection of a pending payment awaiting a decision.
///
/// Not stored anywhere: derived from `payments` rows with `status=pending`
/// joined with the member name, so the queue can never disagree with the
/// ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingApproval {
    pub payment_id: Uuid,
    pub member_id: Uuid,
    pub member_name: String,
    pub date: NaiveDate,
    pub amount_minor: i64,
    pub requested_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub member_id: String,
    pub date: Date,
    pub amount_minor: i64,
    pub status: String,
    pub requested_by: String,
    pub created_at: DateTimeUtc,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTimeUtc>,
    pub rejected_by: Option<String>,
    pub rejected_at: Option<DateTimeUtc>,
    pub cancelled_by: Option<String>,
    pub cancelled_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::members::Entity",
        from = "Column::MemberId",
        to = "super::members::Column::Id"
    )]
    Members,
}

impl Related<super::members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Payment> for ActiveModel {
    fn from(payment: &Payment) -> Self {
        Self {
            id: ActiveValue::Set(payment.id.to_string()),
            member_id: ActiveValue::Set(payment.member_id.to_string()),
            date: ActiveValue::Set(payment.date),
            amount_minor: ActiveValue::Set(payment.amount_minor),
            status: ActiveValue::Set(payment.status.as_str().to_string()),
            requested_by: ActiveValue::Set(payment.requested_by.clone()),
            created_at: ActiveValue::Set(payment.created_at),
            approved_by: ActiveValue::Set(payment.approved_by.clone()),
            approved_at: ActiveValue::Set(payment.approved_at),
            rejected_by: ActiveValue::Set(payment.rejected_by.clone()),
            rejected_at: ActiveValue::Set(payment.rejected_at),
            cancelled_by: ActiveValue::Set(payment.cancelled_by.clone()),
            cancelled_at: ActiveValue::Set(payment.cancelled_at),
        }
    }
}

impl TryFrom<Model> for Payment {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::NotFound("payment".to_string()))?,
            member_id: Uuid::parse_str(&model.member_id)
                .map_err(|_| LedgerError::NotFound("member".to_string()))?,
            date: model.date,
            amount_minor: model.amount_minor,
            status: PaymentStatus::try_from(model.status.as_str())?,
            requested_by: model.requested_by,
            created_at: model.created_at,
            approved_by: model.approved_by,
            approved_at: model.approved_at,
            rejected_by: model.rejected_by,
            rejected_at: model.rejected_at,
            cancelled_by: model.cancelled_by,
            cancelled_at: model.cancelled_at,
        })
    }
}
