//! USSD session handling
//!
//! The state machine in `menu` is a pure function of the replayed input
//! history; applying stock effects and dispatching notifications happens in
//! the HTTP handler layer (`api::ussd`).

pub mod menu;

pub use menu::{respond, MenuStep, StockEffect, UssdResponse};
