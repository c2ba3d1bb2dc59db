//! Post-commit change notifications.
//!
//! Events are published after the owning transaction commits and are keyed by
//! collection, mirroring the way presentation layers subscribe ("something in
//! `payments` changed, re-read what you need"). Delivery is best effort: a
//! missing or lagging subscriber never affects ledger state, and every
//! derived view can be recomputed from the payment and member records.

/// Which collection changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeEvent {
    Members,
    Payments,
    Payouts,
    Votes,
}
