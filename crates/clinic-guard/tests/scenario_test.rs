//! End-to-end login abuse scenarios across orchestrator, gate and admin.

use std::sync::Arc;

use chrono::Duration;
use clinic_guard::{
    Account, AuditKind, AuthFailure, Clock, FailureOrchestrator, GateDecision, GateRequest, GuardAdmin,
    GuardConfig, JsonRecordStore, Ledger, LoginRedirect, ManualClock, MemoryAuditLogger,
    MemoryRecordStore, OutboxMailer, RecordStore, RequestGate, StaticDirectory, Standing,
    Subject,
};

const ADDR: &str = "203.0.113.5";

// ==================== Helper Functions ====================

struct World {
    guard: FailureOrchestrator,
    gate: RequestGate,
    admin: GuardAdmin,
    ledger: Ledger,
    outbox: Arc<OutboxMailer>,
    audit: Arc<MemoryAuditLogger>,
    clock: Arc<ManualClock>,
}

fn world_with_store(store: Arc<dyn RecordStore>) -> World {
    let config = GuardConfig::default();
    let directory: StaticDirectory = [
        Account::new("alice").with_email("alice@example.org"),
        Account::new("carol").with_email("carol@example.org"),
    ]
    .into_iter()
    .collect();
    let outbox = Arc::new(OutboxMailer::new());
    let audit = Arc::new(MemoryAuditLogger::new());
    let clock = Arc::new(ManualClock::default());

    let ledger = Ledger::new(Arc::clone(&store), &config);
    let guard = FailureOrchestrator::new(config.clone(), store, Arc::new(directory))
        .with_mailer(outbox.clone())
        .with_audit(audit.clone())
        .with_clock(clock.clone());
    let gate = RequestGate::new(ledger.clone(), &config).with_clock(clock.clone());
    let admin = GuardAdmin::new(ledger.clone())
        .with_audit(audit.clone())
        .with_clock(clock.clone());

    World {
        guard,
        gate,
        admin,
        ledger,
        outbox,
        audit,
        clock,
    }
}

fn world() -> World {
    world_with_store(Arc::new(MemoryRecordStore::new()))
}

fn bad_login(world: &World, username: &str) -> LoginRedirect {
    world
        .guard
        .on_failure(&AuthFailure::bad_credentials(username, ADDR))
        .unwrap()
}

// ==================== Address Track Scenarios ====================

#[test]
fn test_address_locks_then_bans() {
    let w = world();
    let address = Subject::address(ADDR);

    for i in 0..4 {
        assert_eq!(bad_login(&w, &format!("ghost{i}")), LoginRedirect::Error);
    }
    assert_eq!(bad_login(&w, "ghost4"), LoginRedirect::IpLocked);
    assert_eq!(w.ledger.attempts().count(&address).unwrap(), 0);
    assert_eq!(w.ledger.lockouts().count(&address).unwrap(), 1);

    // The sixth failure starts a fresh attempt count.
    assert_eq!(bad_login(&w, "ghost5"), LoginRedirect::Error);
    assert_eq!(w.ledger.attempts().count(&address).unwrap(), 1);

    for _ in 0..3 {
        assert_eq!(bad_login(&w, "ghost"), LoginRedirect::Error);
    }
    assert_eq!(bad_login(&w, "ghost"), LoginRedirect::IpLocked);
    assert_eq!(w.ledger.lockouts().count(&address).unwrap(), 2);

    for _ in 0..4 {
        assert_eq!(bad_login(&w, "ghost"), LoginRedirect::Error);
    }
    assert_eq!(bad_login(&w, "ghost"), LoginRedirect::IpBanned);
    assert_eq!(w.ledger.lockouts().count(&address).unwrap(), 0);
    assert_eq!(w.ledger.bans().count(&address).unwrap(), 1);

    let kinds = w.audit.kinds();
    assert_eq!(
        kinds.iter().filter(|k| **k == AuditKind::AddressLocked).count(),
        2
    );
    assert!(kinds.contains(&AuditKind::AddressBanned));
}

#[test]
fn test_gate_follows_address_escalation() {
    let w = world();
    for _ in 0..5 {
        bad_login(&w, "ghost");
    }

    let page = GateRequest::new(ADDR, "/patient/records");
    match w.gate.check(&page).unwrap() {
        GateDecision::Redirect {
            reason,
            location,
            invalidate_session,
        } => {
            assert_eq!(reason, LoginRedirect::IpLocked);
            assert_eq!(location, "/login?iplocked");
            assert!(invalidate_session);
        }
        GateDecision::Pass => panic!("locked address passed the gate"),
    }

    let login_view = GateRequest::new(ADDR, "/login").with_query("iplocked");
    assert!(w.gate.check(&login_view).unwrap().is_pass());

    // Other callers are unaffected.
    assert!(w
        .gate
        .check(&GateRequest::new("198.51.100.1", "/patient/records"))
        .unwrap()
        .is_pass());

    w.clock.advance(Duration::minutes(61));
    assert!(w.gate.check(&page).unwrap().is_pass());
}

#[test]
fn test_ban_outlives_lockout_until_lifted() {
    let w = world();
    let address = Subject::address(ADDR);
    w.ledger.bans().record(&address, w.clock.now()).unwrap();

    w.clock.advance(Duration::days(365));
    let decision = w.gate.check(&GateRequest::new(ADDR, "/")).unwrap();
    assert!(!decision.is_pass());

    assert_eq!(w.admin.lift_ban(&address).unwrap(), 1);
    assert!(w.gate.check(&GateRequest::new(ADDR, "/")).unwrap().is_pass());
}

// ==================== Account Track Scenarios ====================

#[test]
fn test_account_lockout_and_notice() {
    let w = world();

    assert_eq!(bad_login(&w, "carol"), LoginRedirect::Error);
    assert_eq!(bad_login(&w, "carol"), LoginRedirect::Locked);

    let sent = w.outbox.drain();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "carol@example.org");
    assert_eq!(sent[0].sender, "iTrust2 System");

    // Account escalation never blocks the address.
    assert!(w.gate.check(&GateRequest::new(ADDR, "/")).unwrap().is_pass());
    assert_eq!(w.guard.account_standing("carol").unwrap(), Standing::Locked);
}

#[test]
fn test_account_banned_after_repeated_lockouts() {
    let w = world();
    let carol = Subject::account("carol");

    let outcomes: Vec<LoginRedirect> = (0..6)
        .map(|_| {
            let outcome = bad_login(&w, "carol");
            // Keep the address track below its threshold.
            w.ledger.attempts().clear(&Subject::address(ADDR)).unwrap();
            outcome
        })
        .collect();

    assert_eq!(
        outcomes,
        vec![
            LoginRedirect::Error,
            LoginRedirect::Locked,
            LoginRedirect::Error,
            LoginRedirect::Locked,
            LoginRedirect::Error,
            LoginRedirect::Banned,
        ]
    );
    assert_eq!(w.ledger.bans().count(&carol).unwrap(), 1);
    assert_eq!(w.ledger.lockouts().count(&carol).unwrap(), 0);
    assert_eq!(w.outbox.len(), 3);
}

#[test]
fn test_disabled_account_with_active_lockout() {
    let w = world();
    let alice = Subject::account("alice");
    let address = Subject::address(ADDR);
    w.ledger
        .lockouts()
        .record(&alice, w.clock.now() - Duration::minutes(10))
        .unwrap();

    let redirect = w
        .guard
        .on_failure(&AuthFailure::disabled("alice", ADDR))
        .unwrap();

    assert_eq!(redirect, LoginRedirect::Locked);
    assert_eq!(w.ledger.attempts().count(&alice).unwrap(), 0);
    assert_eq!(w.ledger.attempts().count(&address).unwrap(), 0);
    assert_eq!(w.ledger.lockouts().count(&alice).unwrap(), 1);
    assert_eq!(w.ledger.bans().count(&alice).unwrap(), 0);
    assert!(w.outbox.is_empty());
}

// ==================== Success Scenarios ====================

#[test]
fn test_success_clears_both_tracks() {
    let w = world();
    bad_login(&w, "carol");
    bad_login(&w, "ghost");

    assert!(w.guard.on_success("carol", ADDR).unwrap());
    assert_eq!(
        w.ledger.attempts().count(&Subject::address(ADDR)).unwrap(),
        0
    );
    assert_eq!(
        w.ledger.attempts().count(&Subject::account("carol")).unwrap(),
        0
    );
}

// ==================== Durable Store Scenarios ====================

#[test]
fn test_lockout_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("guard.json");

    {
        let w = world_with_store(Arc::new(JsonRecordStore::open(&path).unwrap()));
        for _ in 0..5 {
            bad_login(&w, "ghost");
        }
    }

    let w = world_with_store(Arc::new(JsonRecordStore::open(&path).unwrap()));
    let report = w.admin.standing(&Subject::address(ADDR)).unwrap();
    assert_eq!(report.standing, Standing::Locked);
    assert_eq!(report.lockouts, 1);
    assert_eq!(report.attempts, 0);
}
