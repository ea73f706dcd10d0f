//! Stakeholder notification dispatcher
//!
//! After a successful recording effect, every stakeholder gets one message.
//! Sends are independent: a failed delivery is logged and counted but never
//! stops the remaining sends, and the caller treats the whole dispatch as
//! best effort.

use chrono::{DateTime, Utc};
use sitestock_common::db::Stakeholder;
use tracing::{error, info};

use crate::clients::SmsSender;

/// Direction of a recording effect, for the notice wording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Received,
    Used,
}

/// One successful recording, as reported to stakeholders
#[derive(Debug, Clone)]
pub struct RecordingNotice<'a> {
    pub kind: NoticeKind,
    pub material: &'a str,
    pub quantity: i64,
    pub unit: &'a str,
    /// Phone number that recorded the effect
    pub recorded_by: &'a str,
    pub at: DateTime<Utc>,
}

/// Format the notification message for one recording
pub fn format_notice(notice: &RecordingNotice<'_>) -> String {
    let verb = match notice.kind {
        NoticeKind::Received => "RECEIVED",
        NoticeKind::Used => "USED",
    };
    format!(
        "{}: {} {} of {} recorded via USSD by {} at {}.",
        verb,
        notice.quantity,
        notice.unit,
        notice.material,
        notice.recorded_by,
        notice.at.format("%Y-%m-%d %H:%M UTC")
    )
}

/// Send the notice to every stakeholder; returns the number of failed sends.
pub async fn notify_all(
    sms: &dyn SmsSender,
    stakeholders: &[Stakeholder],
    notice: &RecordingNotice<'_>,
) -> usize {
    if stakeholders.is_empty() {
        info!("No stakeholders to notify");
        return 0;
    }

    let message = format_notice(notice);
    let mut failures = 0;

    for stakeholder in stakeholders {
        let recipient = std::slice::from_ref(&stakeholder.phone_number);
        if let Err(e) = sms.send(recipient, &message).await {
            error!(
                "Failed to notify stakeholder {}: {}",
                stakeholder.phone_number, e
            );
            failures += 1;
        }
    }

    if failures == 0 {
        info!("Notified {} stakeholder(s)", stakeholders.len());
    } else {
        error!(
            "Notified {} of {} stakeholder(s); {} send(s) failed",
            stakeholders.len() - failures,
            stakeholders.len(),
            failures
        );
    }

    failures
}
