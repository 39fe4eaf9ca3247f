/*!
 * Lifecycle Module
 * Startup mode selection and the process-level state machine
 */

pub mod controller;
pub mod mode;

pub use controller::LifecycleController;
pub use mode::{decide, decide_after_peek, LifecycleState, StartupDecision, StartupFacts};
