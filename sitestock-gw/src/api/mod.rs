//! HTTP API handlers for sitestock-gw

pub mod health;
pub mod messages;
pub mod ussd;

pub use health::health_routes;
pub use messages::incoming_message;
pub use ussd::ussd_callback;
