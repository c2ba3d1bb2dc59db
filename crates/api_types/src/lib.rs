use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod user {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RegisterUser {
        pub username: String,
        pub password: String,
        pub name: String,
        pub email: String,
    }
}

pub mod member {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PayoutState {
        Unpaid,
        Scheduled,
        Paid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberNew {
        pub name: String,
        pub email: String,
        /// Identity to link the record to; omitted when an admin adds a
        /// member who has not signed up yet.
        pub uid: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberView {
        pub id: Uuid,
        pub name: String,
        pub email: String,
        pub uid: Option<String>,
        pub is_verified: bool,
        pub total_contributed_minor: i64,
        /// ISO dates with an approved contribution, ascending.
        pub paid_dates: Vec<NaiveDate>,
        pub payout_status: PayoutState,
        pub payout_month: Option<i32>,
        pub payout_amount_minor: Option<i64>,
        pub joined_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MembersResponse {
        pub members: Vec<MemberView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MigrateResponse {
        pub created: u64,
    }
}

pub mod payment {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PaymentState {
        Pending,
        Approved,
        Rejected,
        Cancelled,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentMark {
        pub member_id: Uuid,
        pub date: NaiveDate,
        /// Falls back to the fund's configured weekly contribution.
        pub amount_minor: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentMarked {
        pub payment_id: Uuid,
        pub status: PaymentState,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentUndo {
        pub member_id: Uuid,
        pub date: NaiveDate,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentView {
        pub id: Uuid,
        pub member_id: Uuid,
        pub date: NaiveDate,
        pub amount_minor: i64,
        pub status: PaymentState,
        pub requested_by: String,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentsResponse {
        pub payments: Vec<PaymentView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PendingApprovalView {
        pub payment_id: Uuid,
        pub member_id: Uuid,
        pub member_name: String,
        pub date: NaiveDate,
        pub amount_minor: i64,
        pub requested_by: String,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PendingResponse {
        pub pending: Vec<PendingApprovalView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReminderRequest {
        /// Contribution date the reminder is about.
        pub date: NaiveDate,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReminderResponse {
        pub reminded: u64,
    }
}

pub mod payout {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum SlotState {
        Scheduled,
        Completed,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PayoutSelect {
        pub member_id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PayoutRecord {
        pub month: i32,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PayoutSlotView {
        pub id: Uuid,
        pub member_id: Uuid,
        pub month: i32,
        pub amount_minor: i64,
        pub status: SlotState,
        pub selected_by: String,
        pub selected_at: DateTime<Utc>,
        pub completed_by: Option<String>,
        pub completed_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ScheduleResponse {
        pub slots: Vec<PayoutSlotView>,
    }
}

pub mod vote {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct VoteCast {
        /// `None` withdraws the caller's vote.
        pub candidate: Option<Uuid>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct VoteCountView {
        pub member_id: Uuid,
        pub votes: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TallyResponse {
        pub tally: Vec<VoteCountView>,
    }
}

pub mod stats {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FundStats {
        pub contributed_minor: i64,
        pub paid_out_minor: i64,
        pub member_count: u64,
        pub next_payout_month: Option<i32>,
    }
}

pub mod snapshot {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SnapshotResponse {
        pub members: Vec<crate::member::MemberView>,
        pub pending: Vec<crate::payment::PendingApprovalView>,
        pub schedule: Vec<crate::payout::PayoutSlotView>,
        pub stats: crate::stats::FundStats,
    }
}
