//! Leave accounting rules: pure functions over rows already loaded by the
//! caller. Nothing in here touches the database or the clock.

pub mod actor;
pub mod allocation;
pub mod batch;
pub mod days;
pub mod ledger;
pub mod notify;
pub mod request;
