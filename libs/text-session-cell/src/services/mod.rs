// libs/text-session-cell/src/services/mod.rs

pub mod billing;
pub mod lifecycle;
pub mod notify;
pub mod sweeper;

pub use billing::BillingEngine;
pub use lifecycle::{SessionLifecycleService, SessionTimingRules};
pub use notify::{SessionEvent, SessionEventSink, TracingEventSink};
pub use sweeper::{ExpirationSweeper, SweepStats};
