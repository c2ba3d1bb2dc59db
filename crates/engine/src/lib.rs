pub use actor::Actor;
pub use error::LedgerError;
pub use events::ChangeEvent;
pub use members::{Member, PayoutStatus};
pub use ops::{
    DEFAULT_CONTRIBUTION_MINOR, DEFAULT_PAYOUT_MINOR, DEFAULT_SLOT_COUNT, Engine, EngineBuilder,
    FundTotals, LedgerSnapshot, MemberContribution, VoteCount,
};
pub use payments::{MarkOutcome, Payment, PaymentStatus, PendingApproval};
pub use payouts::{PayoutSlot, SlotStatus};

mod actor;
mod error;
mod events;
mod members;
mod ops;
mod payments;
mod payouts;
mod users;
mod votes;

type ResultLedger<T> = Result<T, LedgerError>;
