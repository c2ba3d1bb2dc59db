use chrono::{NaiveDate, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    Actor, ChangeEvent, DEFAULT_CONTRIBUTION_MINOR, DEFAULT_PAYOUT_MINOR, Engine, LedgerError,
    Member, PaymentStatus, PayoutStatus, SlotStatus,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    for (username, admin) in [("alice", true), ("bob", false), ("carol", false)] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password, name, email, is_admin) VALUES (?, ?, ?, ?, ?)",
            vec![
                username.into(),
                "password".into(),
                username.into(),
                format!("{username}@example.com").into(),
                admin.into(),
            ],
        ))
        .await
        .unwrap();
    }
    let engine = Engine::builder().database(db.clone()).build().unwrap();
    (engine, db)
}

fn admin() -> Actor {
    Actor::admin("alice".to_string())
}

fn bob() -> Actor {
    Actor::member("bob".to_string())
}

fn carol() -> Actor {
    Actor::member("carol".to_string())
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

async fn member_for(engine: &Engine, actor: &Actor, uid: &str) -> Member {
    engine
        .add_member(
            actor,
            uid,
            &format!("{uid}@example.com"),
            Some(uid),
            Utc::now(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn admin_mark_is_approved_and_credited_immediately() {
    let (engine, _db) = engine_with_db().await;
    let member = member_for(&engine, &admin(), "bob").await;

    let outcome = engine
        .mark_payment(&admin(), member.id, date("2026-01-05"), None, Utc::now())
        .await
        .unwrap();
    assert_eq!(outcome.status, PaymentStatus::Approved);

    let member = engine.get_member(member.id).await.unwrap();
    assert_eq!(member.total_contributed_minor, DEFAULT_CONTRIBUTION_MINOR);
    assert!(member.paid_dates.contains(&date("2026-01-05")));
}

#[tokio::test]
async fn member_mark_waits_in_the_queue_until_approved() {
    let (engine, _db) = engine_with_db().await;
    let member = member_for(&engine, &bob(), "bob").await;

    let outcome = engine
        .mark_payment(&bob(), member.id, date("2026-01-05"), None, Utc::now())
        .await
        .unwrap();
    assert_eq!(outcome.status, PaymentStatus::Pending);

    let untouched = engine.get_member(member.id).await.unwrap();
    assert_eq!(untouched.total_contributed_minor, 0);
    assert!(untouched.paid_dates.is_empty());

    let queue = engine.list_pending_approvals(&admin()).await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].payment_id, outcome.payment_id);
    assert_eq!(queue[0].member_name, "bob");
    assert_eq!(queue[0].amount_minor, DEFAULT_CONTRIBUTION_MINOR);

    engine
        .approve_payment(&admin(), outcome.payment_id, Utc::now())
        .await
        .unwrap();
    let credited = engine.get_member(member.id).await.unwrap();
    assert_eq!(credited.total_contributed_minor, DEFAULT_CONTRIBUTION_MINOR);
    assert!(engine.list_pending_approvals(&admin()).await.unwrap().is_empty());
}

#[tokio::test]
async fn approving_a_resolved_payment_conflicts() {
    let (engine, _db) = engine_with_db().await;
    let member = member_for(&engine, &bob(), "bob").await;
    let outcome = engine
        .mark_payment(&bob(), member.id, date("2026-01-05"), None, Utc::now())
        .await
        .unwrap();
    engine
        .approve_payment(&admin(), outcome.payment_id, Utc::now())
        .await
        .unwrap();

    let err = engine
        .approve_payment(&admin(), outcome.payment_id, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyResolved(_)));

    let member = engine.get_member(member.id).await.unwrap();
    assert_eq!(member.total_contributed_minor, DEFAULT_CONTRIBUTION_MINOR);
}

#[tokio::test]
async fn rejection_keeps_totals_and_frees_the_slot() {
    let (engine, _db) = engine_with_db().await;
    let member = member_for(&engine, &bob(), "bob").await;
    let outcome = engine
        .mark_payment(&bob(), member.id, date("2026-01-05"), None, Utc::now())
        .await
        .unwrap();
    engine
        .reject_payment(&admin(), outcome.payment_id, Utc::now())
        .await
        .unwrap();

    let member_after = engine.get_member(member.id).await.unwrap();
    assert_eq!(member_after.total_contributed_minor, 0);

    // The slot is claimable again after the rejection.
    let retry = engine
        .mark_payment(&bob(), member.id, date("2026-01-05"), None, Utc::now())
        .await
        .unwrap();
    assert_eq!(retry.status, PaymentStatus::Pending);
}

#[tokio::test]
async fn undo_reverses_the_amount_stored_on_the_payment() {
    let (engine, _db) = engine_with_db().await;
    let member = member_for(&engine, &admin(), "bob").await;

    engine
        .mark_payment(&admin(), member.id, date("2026-01-05"), None, Utc::now())
        .await
        .unwrap();
    engine
        .mark_payment(
            &admin(),
            member.id,
            date("2026-01-12"),
            Some(20_000),
            Utc::now(),
        )
        .await
        .unwrap();

    let undone = engine
        .undo_payment(&admin(), member.id, date("2026-01-12"), Utc::now())
        .await
        .unwrap();
    assert_eq!(undone.status, PaymentStatus::Cancelled);
    assert_eq!(undone.amount_minor, 20_000);

    let member = engine.get_member(member.id).await.unwrap();
    assert_eq!(member.total_contributed_minor, DEFAULT_CONTRIBUTION_MINOR);
    assert!(!member.paid_dates.contains(&date("2026-01-12")));
}

#[tokio::test]
async fn member_can_withdraw_their_own_pending_claim() {
    let (engine, _db) = engine_with_db().await;
    let member = member_for(&engine, &bob(), "bob").await;
    engine
        .mark_payment(&bob(), member.id, date("2026-01-05"), None, Utc::now())
        .await
        .unwrap();

    engine
        .undo_payment(&bob(), member.id, date("2026-01-05"), Utc::now())
        .await
        .unwrap();

    let member_after = engine.get_member(member.id).await.unwrap();
    assert_eq!(member_after.total_contributed_minor, 0);
    assert!(engine.list_pending_approvals(&admin()).await.unwrap().is_empty());

    // Withdrawing freed the slot.
    engine
        .mark_payment(&bob(), member.id, date("2026-01-05"), None, Utc::now())
        .await
        .unwrap();
}

#[tokio::test]
async fn member_can_undo_their_own_approved_payment() {
    let (engine, _db) = engine_with_db().await;
    let member = member_for(&engine, &bob(), "bob").await;
    let pending = engine
        .mark_payment(&bob(), member.id, date("2026-01-05"), None, Utc::now())
        .await
        .unwrap();
    engine
        .approve_payment(&admin(), pending.payment_id, Utc::now())
        .await
        .unwrap();

    let undone = engine
        .undo_payment(&bob(), member.id, date("2026-01-05"), Utc::now())
        .await
        .unwrap();
    assert_eq!(undone.status, PaymentStatus::Cancelled);

    let member = engine.get_member(member.id).await.unwrap();
    assert_eq!(member.total_contributed_minor, 0);
    assert!(member.paid_dates.is_empty());
}

#[tokio::test]
async fn unpaid_members_are_those_without_an_approved_contribution() {
    let (engine, _db) = engine_with_db().await;
    let paid = member_for(&engine, &admin(), "m1").await;
    let claimed = member_for(&engine, &bob(), "bob").await;
    let silent = member_for(&engine, &admin(), "m2").await;

    engine
        .mark_payment(&admin(), paid.id, date("2026-01-05"), None, Utc::now())
        .await
        .unwrap();
    // A pending claim does not count as paid.
    engine
        .mark_payment(&bob(), claimed.id, date("2026-01-05"), None, Utc::now())
        .await
        .unwrap();

    let unpaid = engine
        .unpaid_members(&admin(), date("2026-01-05"))
        .await
        .unwrap();
    let ids: Vec<_> = unpaid.iter().map(|member| member.id).collect();
    assert!(!ids.contains(&paid.id));
    assert!(ids.contains(&claimed.id));
    assert!(ids.contains(&silent.id));

    let err = engine
        .unpaid_members(&bob(), date("2026-01-05"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::PermissionDenied(_)));
}

#[tokio::test]
async fn a_slot_with_an_active_payment_cannot_be_claimed_twice() {
    let (engine, _db) = engine_with_db().await;
    let member = member_for(&engine, &bob(), "bob").await;
    engine
        .mark_payment(&bob(), member.id, date("2026-01-05"), None, Utc::now())
        .await
        .unwrap();

    let err = engine
        .mark_payment(&bob(), member.id, date("2026-01-05"), None, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState(_)));
}

#[tokio::test]
async fn only_admins_touch_other_people() {
    let (engine, _db) = engine_with_db().await;
    let member = member_for(&engine, &bob(), "bob").await;

    let err = engine
        .mark_payment(&carol(), member.id, date("2026-01-05"), None, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::PermissionDenied(_)));

    let pending = engine
        .mark_payment(&bob(), member.id, date("2026-01-05"), None, Utc::now())
        .await
        .unwrap();
    let err = engine
        .approve_payment(&bob(), pending.payment_id, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::PermissionDenied(_)));

    let err = engine
        .select_recipient(&bob(), member.id, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::PermissionDenied(_)));
}

#[tokio::test]
async fn invalid_amount_is_refused() {
    let (engine, _db) = engine_with_db().await;
    let member = member_for(&engine, &admin(), "bob").await;

    let err = engine
        .mark_payment(
            &admin(),
            member.id,
            date("2026-01-05"),
            Some(0),
            Utc::now(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(_)));
}

#[tokio::test]
async fn slots_fill_lowest_month_first_until_exhausted() {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .slot_count(2)
        .build()
        .unwrap();

    let first = member_for(&engine, &admin(), "m1").await;
    let second = member_for(&engine, &admin(), "m2").await;
    let third = member_for(&engine, &admin(), "m3").await;

    let slot = engine
        .select_recipient(&admin(), first.id, Utc::now())
        .await
        .unwrap();
    assert_eq!(slot.month, 1);
    let slot = engine
        .select_recipient(&admin(), second.id, Utc::now())
        .await
        .unwrap();
    assert_eq!(slot.month, 2);

    let err = engine
        .select_recipient(&admin(), third.id, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState(_)));
}

#[tokio::test]
async fn a_member_holds_at_most_one_slot() {
    let (engine, _db) = engine_with_db().await;
    let member = member_for(&engine, &admin(), "bob").await;
    engine
        .select_recipient(&admin(), member.id, Utc::now())
        .await
        .unwrap();

    let err = engine
        .select_recipient(&admin(), member.id, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState(_)));
}

#[tokio::test]
async fn selection_resets_the_vote_table() {
    let (engine, _db) = engine_with_db().await;
    let member = member_for(&engine, &admin(), "bob").await;
    engine.cast_vote(&bob(), member.id, Utc::now()).await.unwrap();
    engine
        .cast_vote(&carol(), member.id, Utc::now())
        .await
        .unwrap();
    assert_eq!(engine.vote_tally().await.unwrap().len(), 1);

    engine
        .select_recipient(&admin(), member.id, Utc::now())
        .await
        .unwrap();
    assert!(engine.vote_tally().await.unwrap().is_empty());

    let member = engine.get_member(member.id).await.unwrap();
    assert_eq!(member.payout_status, PayoutStatus::Scheduled);
    assert_eq!(member.payout_month, Some(1));
}

#[tokio::test]
async fn recording_a_payout_settles_the_member() {
    let (engine, _db) = engine_with_db().await;
    let member = member_for(&engine, &admin(), "bob").await;
    let slot = engine
        .select_recipient(&admin(), member.id, Utc::now())
        .await
        .unwrap();

    let recorded = engine
        .record_payout(&admin(), slot.month, Utc::now())
        .await
        .unwrap();
    assert_eq!(recorded.status, SlotStatus::Completed);

    let member = engine.get_member(member.id).await.unwrap();
    assert_eq!(member.payout_status, PayoutStatus::Paid);
    assert_eq!(member.payout_month, Some(slot.month));
    assert_eq!(member.payout_amount_minor, Some(DEFAULT_PAYOUT_MINOR));

    let err = engine
        .record_payout(&admin(), slot.month, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyCompleted(_)));
}

#[tokio::test]
async fn paid_members_cannot_be_removed() {
    let (engine, _db) = engine_with_db().await;
    let member = member_for(&engine, &admin(), "bob").await;
    let slot = engine
        .select_recipient(&admin(), member.id, Utc::now())
        .await
        .unwrap();
    engine
        .record_payout(&admin(), slot.month, Utc::now())
        .await
        .unwrap();

    let err = engine.remove_member(&admin(), member.id).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState(_)));
    assert_eq!(engine.list_members().await.unwrap().len(), 1);
}

#[tokio::test]
async fn removing_a_member_releases_their_scheduled_slot() {
    let (engine, _db) = engine_with_db().await;
    let member = member_for(&engine, &admin(), "bob").await;
    let other = member_for(&engine, &admin(), "carol").await;
    engine
        .select_recipient(&admin(), member.id, Utc::now())
        .await
        .unwrap();

    engine.remove_member(&admin(), member.id).await.unwrap();
    assert!(engine.payout_schedule().await.unwrap().is_empty());

    // Month 1 is available again.
    let slot = engine
        .select_recipient(&admin(), other.id, Utc::now())
        .await
        .unwrap();
    assert_eq!(slot.month, 1);
}

#[tokio::test]
async fn a_retracted_vote_is_not_counted() {
    let (engine, _db) = engine_with_db().await;
    let member = member_for(&engine, &admin(), "m1").await;
    engine.cast_vote(&bob(), member.id, Utc::now()).await.unwrap();
    engine
        .cast_vote(&carol(), member.id, Utc::now())
        .await
        .unwrap();

    engine.clear_vote(&bob(), Utc::now()).await.unwrap();

    let tally = engine.vote_tally().await.unwrap();
    assert_eq!(tally.len(), 1);
    assert_eq!(tally[0].member_id, member.id);
    assert_eq!(tally[0].votes, 1);
}

#[tokio::test]
async fn migrate_users_backfills_missing_members() {
    let (engine, _db) = engine_with_db().await;
    member_for(&engine, &admin(), "alice").await;

    // bob and carol exist as users but not as members.
    let created = engine.migrate_users(&admin(), Utc::now()).await.unwrap();
    assert_eq!(created, 2);
    assert_eq!(engine.list_members().await.unwrap().len(), 3);

    // Running it again is a no-op.
    let created = engine.migrate_users(&admin(), Utc::now()).await.unwrap();
    assert_eq!(created, 0);
}

#[tokio::test]
async fn adding_the_same_email_twice_links_instead_of_duplicating() {
    let (engine, _db) = engine_with_db().await;
    let unlinked = engine
        .add_member(&admin(), "Bob", "bob@example.com", None, Utc::now())
        .await
        .unwrap();
    assert_eq!(unlinked.uid, None);

    let linked = engine
        .add_member(&bob(), "Bob B.", "bob@example.com", Some("bob"), Utc::now())
        .await
        .unwrap();
    assert_eq!(linked.id, unlinked.id);
    assert_eq!(linked.uid.as_deref(), Some("bob"));
    assert_eq!(engine.list_members().await.unwrap().len(), 1);
}

#[tokio::test]
async fn snapshot_totals_agree_with_the_pieces() {
    let (engine, _db) = engine_with_db().await;
    let first = member_for(&engine, &admin(), "m1").await;
    let second = member_for(&engine, &admin(), "m2").await;

    engine
        .mark_payment(&admin(), first.id, date("2026-01-05"), None, Utc::now())
        .await
        .unwrap();
    engine
        .mark_payment(&admin(), second.id, date("2026-01-05"), None, Utc::now())
        .await
        .unwrap();
    let slot = engine
        .select_recipient(&admin(), first.id, Utc::now())
        .await
        .unwrap();
    engine
        .record_payout(&admin(), slot.month, Utc::now())
        .await
        .unwrap();

    let snapshot = engine.ledger_snapshot().await.unwrap();
    assert_eq!(snapshot.members.len(), 2);
    assert_eq!(
        snapshot.totals.contributed_minor,
        2 * DEFAULT_CONTRIBUTION_MINOR
    );
    assert_eq!(snapshot.totals.paid_out_minor, DEFAULT_PAYOUT_MINOR);
    assert_eq!(snapshot.payout_schedule.len(), 1);
    assert!(snapshot.pending_approvals.is_empty());
}

#[tokio::test]
async fn recompute_totals_repairs_counter_drift() {
    let (engine, db) = engine_with_db().await;
    let member = member_for(&engine, &admin(), "bob").await;
    engine
        .mark_payment(&admin(), member.id, date("2026-01-05"), None, Utc::now())
        .await
        .unwrap();

    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "UPDATE members SET total_contributed_minor = 0 WHERE id = ?",
        vec![member.id.to_string().into()],
    ))
    .await
    .unwrap();

    let corrected = engine.recompute_totals(&admin()).await.unwrap();
    assert_eq!(corrected, 1);
    let member = engine.get_member(member.id).await.unwrap();
    assert_eq!(member.total_contributed_minor, DEFAULT_CONTRIBUTION_MINOR);
}

#[tokio::test]
async fn subscribers_see_events_after_commit() {
    let (engine, _db) = engine_with_db().await;
    let mut events = engine.subscribe();

    member_for(&engine, &admin(), "bob").await;

    let event = events.recv().await.unwrap();
    assert_eq!(event, ChangeEvent::Members);
}
