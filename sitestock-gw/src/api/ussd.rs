//! USSD session callback endpoint
//!
//! One POST per session step. The handler replays the input history through
//! the pure menu state machine, applies the stock effect it requests (if
//! any), dispatches stakeholder notifications, and replies plain text with
//! the CON/END prefix the gateway dispatches on.

use axum::extract::{Form, State};
use chrono::Utc;
use serde::Deserialize;
use sitestock_common::db;
use tracing::{error, info};

use crate::notify::{self, NoticeKind, RecordingNotice};
use crate::ussd::menu::{self, StockEffect, UssdResponse};
use crate::AppState;

/// Generic apology when the store is unavailable mid-session
pub const STORE_APOLOGY: &str = "Sorry, something went wrong. Please try again later.";

/// Session callback payload, as posted by the telephony gateway
#[derive(Debug, Deserialize)]
pub struct UssdCallback {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "serviceCode", default)]
    pub service_code: Option<String>,
    #[serde(rename = "phoneNumber")]
    pub phone_number: String,
    #[serde(default)]
    pub text: String,
}

/// POST /ussd
pub async fn ussd_callback(
    State(state): State<AppState>,
    Form(callback): Form<UssdCallback>,
) -> String {
    info!(
        "Session {}: received input {:?} from {}",
        callback.session_id, callback.text, callback.phone_number
    );

    let materials = match db::list_materials(&state.db).await {
        Ok(materials) => materials,
        Err(e) => {
            error!(
                "Session {}: failed to load materials: {}",
                callback.session_id, e
            );
            return UssdResponse::End(STORE_APOLOGY.to_string()).render();
        }
    };

    let step = menu::respond(&materials, &callback.text);

    let response = match step.effect {
        Some(effect) => apply_effect(&state, &materials, effect, &callback, step.response).await,
        None => step.response,
    };

    let rendered = response.render();
    info!("Session {}: replying {:?}", callback.session_id, rendered);
    rendered
}

/// Apply a stock effect requested by the state machine.
///
/// The store update commits before notifications go out, so a notification
/// failure can never roll back the recorded stock. Store failures collapse
/// into the generic apology.
async fn apply_effect(
    state: &AppState,
    materials: &[db::Material],
    effect: StockEffect,
    callback: &UssdCallback,
    provisional: UssdResponse,
) -> UssdResponse {
    match effect {
        StockEffect::Receipt { material, quantity } => {
            let m = &materials[material];
            match db::record_receipt(&state.db, m.id, quantity).await {
                Ok(true) => {
                    dispatch_notice(state, NoticeKind::Received, m, quantity, callback).await;
                    provisional
                }
                Ok(false) => {
                    error!(
                        "Session {}: material {} vanished during recording",
                        callback.session_id, m.name
                    );
                    UssdResponse::End(STORE_APOLOGY.to_string())
                }
                Err(e) => {
                    error!(
                        "Session {}: failed to record receipt: {}",
                        callback.session_id, e
                    );
                    UssdResponse::End(STORE_APOLOGY.to_string())
                }
            }
        }
        StockEffect::Usage { material, quantity } => {
            let m = &materials[material];
            match db::record_usage(&state.db, m.id, quantity).await {
                Ok(Some(remaining)) => {
                    dispatch_notice(state, NoticeKind::Used, m, quantity, callback).await;
                    UssdResponse::End(format!(
                        "Used {} {} of {}. {} {} remaining.",
                        quantity, m.unit, m.name, remaining, m.unit
                    ))
                }
                Ok(None) => {
                    // Refused atomically: not enough stock at update time
                    let available = db::get_material(&state.db, m.id)
                        .await
                        .ok()
                        .flatten()
                        .map(|current| current.quantity)
                        .unwrap_or(m.quantity);
                    UssdResponse::End(format!(
                        "Cannot use {} {}. Only {} available.",
                        quantity, m.unit, available
                    ))
                }
                Err(e) => {
                    error!(
                        "Session {}: failed to record usage: {}",
                        callback.session_id, e
                    );
                    UssdResponse::End(STORE_APOLOGY.to_string())
                }
            }
        }
    }
}

/// Best-effort stakeholder notification after a committed recording
async fn dispatch_notice(
    state: &AppState,
    kind: NoticeKind,
    material: &db::Material,
    quantity: i64,
    callback: &UssdCallback,
) {
    let stakeholders = match db::list_stakeholders(&state.db).await {
        Ok(stakeholders) => stakeholders,
        Err(e) => {
            error!(
                "Session {}: failed to load stakeholder directory: {}",
                callback.session_id, e
            );
            return;
        }
    };

    let notice = RecordingNotice {
        kind,
        material: &material.name,
        quantity,
        unit: &material.unit,
        recorded_by: &callback.phone_number,
        at: Utc::now(),
    };

    notify::notify_all(state.sms.as_ref(), &stakeholders, &notice).await;
}
