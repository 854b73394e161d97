//! Application layer wiring validation, target selection, and generation together.

pub mod coordinator;
pub mod dispatch;
pub mod distributor;
pub mod playground;
pub mod session;
pub mod target;
pub mod validation;
