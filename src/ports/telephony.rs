//! Telephony signaling and media-control port.

use async_trait::async_trait;

use crate::error::Result;
use crate::value_objects::{CallId, PhoneNumber};

/// Interface for telephony providers (e.g. a SIP trunk or PSTN gateway):
/// call signaling and media-stream control.
#[async_trait]
pub trait TelephonyPort: Send + Sync {
    /// Hang up an active call.
    async fn end_call(&self, call_id: &CallId) -> Result<()>;

    /// Transfer a call to another number.
    async fn transfer_call(&self, call_id: &CallId, target: &PhoneNumber) -> Result<()>;

    /// Send DTMF tones, e.g. for IVR navigation.
    async fn send_dtmf(&self, call_id: &CallId, digits: &str) -> Result<()>;

    /// Answer an incoming call identified by a provider-specific control id.
    async fn answer_call(&self, call_control_id: &str) -> Result<()>;

    /// Start media streaming to `stream_url`.
    async fn start_streaming(
        &self,
        call_control_id: &str,
        stream_url: &str,
        client_state: Option<&str>,
    ) -> Result<()>;
}
