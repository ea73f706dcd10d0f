//! Inbound free-text message endpoint
//!
//! The messaging gateway posts each received SMS here. The reply travels
//! back through the outbound SMS client, not the HTTP response body; the
//! gateway only needs the status code as an acknowledgement.

use axum::extract::{Form, State};
use axum::http::StatusCode;
use serde::Deserialize;
use sitestock_common::Error;
use tracing::{error, info, warn};

use crate::advisor;
use crate::AppState;

/// Incoming message payload, as posted by the messaging gateway
#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub from: Option<String>,
    pub text: Option<String>,
    pub id: Option<String>,
}

/// POST /incoming-messages
pub async fn incoming_message(
    State(state): State<AppState>,
    Form(message): Form<IncomingMessage>,
) -> StatusCode {
    let (Some(from), Some(text)) = (message.from, message.text) else {
        warn!("Incomplete message payload (id {:?})", message.id);
        return StatusCode::BAD_REQUEST;
    };

    info!("Message {:?} from {}: {:?}", message.id, from, text);

    let reply =
        match advisor::answer_free_text(&state.db, state.completion.as_ref(), &from, &text).await {
            Ok(reply) => reply,
            Err(Error::InvalidInput(reason)) => {
                warn!("Rejected message from {}: {}", from, reason);
                return StatusCode::BAD_REQUEST;
            }
            Err(e) => {
                error!("Failed to answer message from {}: {}", from, e);
                return StatusCode::INTERNAL_SERVER_ERROR;
            }
        };

    info!("Replying to {}: {:?}", from, reply);
    let recipient = std::slice::from_ref(&from);
    if let Err(e) = state.sms.send(recipient, &reply).await {
        // Reply delivery is best effort; the gateway still gets its ack
        error!("Failed to send reply to {}: {}", from, e);
    }

    StatusCode::OK
}
