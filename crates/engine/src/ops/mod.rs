use sea_orm::DatabaseConnection;
use tokio::sync::broadcast;

use crate::{ChangeEvent, LedgerError, ResultLedger};

mod access;
mod members;
mod payments;
mod payouts;
mod votes;

pub use members::{FundTotals, LedgerSnapshot, MemberContribution};
pub use votes::VoteCount;

/// Weekly contribution in minor units when the caller supplies none.
pub const DEFAULT_CONTRIBUTION_MINOR: i64 = 15_625;
/// Pooled payout per slot in minor units.
pub const DEFAULT_PAYOUT_MINOR: i64 = 562_500;
/// Number of payout slots in one full rotation.
pub const DEFAULT_SLOT_COUNT: u32 = 9;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: Result<_, crate::LedgerError> = async { $body }.await;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                $tx.rollback().await?;
                Err(err)
            }
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    slot_count: u32,
    contribution_amount_minor: i64,
    payout_amount_minor: i64,
    events: broadcast::Sender<ChangeEvent>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Subscribe to post-commit change events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    pub fn slot_count(&self) -> u32 {
        self.slot_count
    }

    pub fn contribution_amount_minor(&self) -> i64 {
        self.contribution_amount_minor
    }

    pub fn payout_amount_minor(&self) -> i64 {
        self.payout_amount_minor
    }

    /// Best effort: there may be no subscribers at all.
    fn publish(&self, event: ChangeEvent) {
        let _ = self.events.send(event);
    }
}

pub(crate) fn normalize_required(value: &str, label: &str) -> ResultLedger<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::InvalidState(format!(
            "{label} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    slot_count: u32,
    contribution_amount_minor: i64,
    payout_amount_minor: i64,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            slot_count: DEFAULT_SLOT_COUNT,
            contribution_amount_minor: DEFAULT_CONTRIBUTION_MINOR,
            payout_amount_minor: DEFAULT_PAYOUT_MINOR,
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    pub fn slot_count(mut self, slots: u32) -> EngineBuilder {
        self.slot_count = slots;
        self
    }

    pub fn contribution_amount_minor(mut self, amount_minor: i64) -> EngineBuilder {
        self.contribution_amount_minor = amount_minor;
        self
    }

    pub fn payout_amount_minor(mut self, amount_minor: i64) -> EngineBuilder {
        self.payout_amount_minor = amount_minor;
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> ResultLedger<Engine> {
        if self.slot_count == 0 {
            return Err(LedgerError::InvalidState(
                "slot_count must be at least 1".to_string(),
            ));
        }
        if self.contribution_amount_minor <= 0 || self.payout_amount_minor <= 0 {
            return Err(LedgerError::InvalidAmount(
                "amounts must be > 0".to_string(),
            ));
        }
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Engine {
            database: self.database,
            slot_count: self.slot_count,
            contribution_amount_minor: self.contribution_amount_minor,
            payout_amount_minor: self.payout_amount_minor,
            events,
        })
    }
}
