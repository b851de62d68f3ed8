//! Outbound notifications - transactional email for order lifecycle events
//!
//! This crate provides the delivery side of Bazari's notifications:
//! - **Gateway** (`email`) - Brevo-compatible HTTP email API client
//! - **Messages** (`messages`) - seller/buyer/status/reminder mail composition
//!
//! Delivery is always best-effort: a failed send surfaces as an [`email::EmailError`]
//! that callers log and swallow. No order or stock mutation may ever be blocked
//! by the email path.

pub mod email;
pub mod messages;

pub use email::{gateway_from_config, BrevoGateway, EmailError, EmailGateway, NoopGateway};
pub use messages::{EmailMessage, LineSummary};
