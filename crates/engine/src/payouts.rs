//! Payout slots: one per month index, rotating the pooled amount through the
//! membership. `month` is unique across all slots and a member can hold at
//! most one slot, scheduled or completed.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::LedgerError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Scheduled,
    Completed,
}

impl SlotStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
        }
    }
}

impl TryFrom<&str> for SlotStatus {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "scheduled" => Ok(Self::Scheduled),
            "completed" => Ok(Self::Completed),
            other => Err(LedgerError::InvalidState(format!(
                "invalid payout slot status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PayoutSlot {
    pub id: Uuid,
    pub member_id: Uuid,
    pub month: i32,
    pub amount_minor: i64,
    pub status: SlotStatus,
    pub selected_by: String,
    pub selected_at: DateTime<Utc>,
    pub completed_by: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PayoutSlot {
    pub fn new(
        member_id: Uuid,
        month: i32,
        amount_minor: i64,
        selected_by: String,
        selected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_id,
            month,
            amount_minor,
            status: SlotStatus::Scheduled,
            selected_by,
            selected_at,
            completed_by: None,
            completed_at: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payout_slots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub member_id: String,
    pub month: i32,
    pub amount_minor: i64,
    pub status: String,
    pub selected_by: String,
    pub selected_at: DateTimeUtc,
    pub completed_by: Option<String>,
    pub completed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&PayoutSlot> for ActiveModel {
    fn from(slot: &PayoutSlot) -> Self {
        Self {
            id: ActiveValue::Set(slot.id.to_string()),
            member_id: ActiveValue::Set(slot.member_id.to_string()),
            month: ActiveValue::Set(slot.month),
            amount_minor: ActiveValue::Set(slot.amount_minor),
            status: ActiveValue::Set(slot.status.as_str().to_string()),
            selected_by: ActiveValue::Set(slot.selected_by.clone()),
            selected_at: ActiveValue::Set(slot.selected_at),
            completed_by: ActiveValue::Set(slot.completed_by.clone()),
            completed_at: ActiveValue::Set(slot.completed_at),
        }
    }
}

impl TryFrom<Model> for PayoutSlot {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::NotFound("payout slot".to_string()))?,
            member_id: Uuid::parse_str(&model.member_id)
                .map_err(|_| LedgerError::NotFound("member".to_string()))?,
            month: model.month,
            amount_minor: model.amount_minor,
            status: SlotStatus::try_from(model.status.as_str())?,
            selected_by: model.selected_by,
            selected_at: model.selected_at,
            completed_by: model.completed_by,
            completed_at: model.completed_at,
        })
    }
}
