//! Webex API integration module.
//!
//! This module provides the REST client, the [`WebexApi`] seam used by the
//! provisioning flows, and the rate-limit retry helper.

mod api;
mod client;
pub mod retry;
mod types;

pub use api::{Setting, SettingTarget, WebexApi};
pub use client::WebexClient;
pub use retry::{invoke_with_retry_after, retry_after_wait_seconds};
pub use types::{
    AddNumbers, CallQueueSummary, LicenseAssignment, LocationAddress, LocationSummary,
    NewLocation, NumberState, NumberType, PremiseRouteType, PstnConnection,
};

#[cfg(test)]
pub(crate) mod testing;
