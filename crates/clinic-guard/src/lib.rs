//! # clinic-guard
//!
//! Login abuse mitigation for the clinical records portal.
//!
//! Failed logins are tracked on two independent tracks, one per source
//! address and one per account, and escalate through three tiers:
//!
//! - **Attempt**: one failed login. Reaching the track's attempt threshold
//!   clears the attempts and promotes.
//! - **Lockout**: temporary block, active for one hour after it is recorded.
//! - **Ban**: permanent block, lifted only by an operator.
//!
//! ## Components
//!
//! - [`Ledger`] / [`RecordStore`] - attempt, lockout and ban tables
//! - [`EscalationPolicy`] - threshold rule and tier promotion
//! - [`FailureOrchestrator`] - reacts to login failures and successes
//! - [`RequestGate`] - per-request address filter
//! - [`GuardAdmin`] - operator inspection and clearing
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use clinic_guard::{
//!     AuthFailure, FailureOrchestrator, GuardConfig, LoginRedirect, MemoryRecordStore,
//!     StaticDirectory,
//! };
//!
//! let guard = FailureOrchestrator::new(
//!     GuardConfig::default(),
//!     Arc::new(MemoryRecordStore::new()),
//!     Arc::new(StaticDirectory::new()),
//! );
//!
//! let failure = AuthFailure::bad_credentials("nobody", "203.0.113.5");
//! for _ in 0..4 {
//!     assert_eq!(guard.on_failure(&failure)?, LoginRedirect::Error);
//! }
//! assert_eq!(guard.on_failure(&failure)?, LoginRedirect::IpLocked);
//! # Ok::<(), clinic_guard::GuardError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod admin;
pub mod audit;
pub mod clock;
pub mod config;
pub mod directory;
pub mod error;
pub mod gate;
pub mod notify;
pub mod orchestrator;
pub mod policy;
pub mod redirect;
pub mod store;
pub mod subject;

pub use admin::{GuardAdmin, SubjectReport};
pub use audit::{
    AuditEvent, AuditKind, AuditLogger, MemoryAuditLogger, NoopAuditLogger, Severity,
    TracingAuditLogger,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{GuardConfig, GuardConfigBuilder, NoticeConfig, TrackConfig};
pub use directory::{Account, Directory, StaticDirectory};
pub use error::{GuardError, GuardResult};
pub use gate::{GateDecision, GateRequest, RequestGate};
pub use notify::{Mailer, NoopMailer, Notification, OutboxMailer};
pub use orchestrator::{AuthFailure, FailureKind, FailureOrchestrator};
pub use policy::{Decision, Escalation, EscalationPolicy, decide};
pub use redirect::{LoginRedirect, Standing};
pub use store::{JsonRecordStore, Ledger, MemoryRecordStore, RecordStore, TierStore};
pub use subject::{AbuseRecord, Subject, SubjectKind, Tier};
