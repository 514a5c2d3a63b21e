//! Alarm rule engine
//!
//! Evaluates computed metric values against operator-defined rules in
//! near-real time and fans firings out to injected callbacks.
//!
//! ## Data Flow
//!
//! ```text
//!   metric samples
//!        │ notify()
//!        ▼
//!   NotifyDispatcher ──subject lookup──▶ InventoryCache
//!        │ find_running_rules(metric)
//!        ▼
//!   AlarmCore ──snapshot──▶ RunningRule windows (per entity)
//!        │ on transition into Fired
//!        ▼
//!   AlarmCallback fan-out (failures isolated per callback)
//! ```
//!
//! Rule definitions are owned by the [`watcher::RulesWatcher`]; a reload
//! swaps the whole set atomically, never leaving a mixed rule set visible
//! to in-flight evaluations.

pub mod core;
pub mod event;
pub mod notify;
pub mod rule;
pub mod running;
pub mod watcher;

pub use self::core::AlarmCore;
pub use event::{AlarmCallback, AlarmMessage, AlarmSubject};
pub use notify::NotifyDispatcher;
pub use rule::{AlarmRule, CompareOp};
pub use running::{RunningRule, WindowEvaluation};
pub use watcher::RulesWatcher;
