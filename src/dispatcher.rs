/// Notification dispatch: fan alerts out to recipients, exactly once per
/// (alert, recipient) pair.
///
/// Per pair, in order: region filter, ledger dedup check, render, send,
/// record. The ledger record is written only after the send is confirmed
/// — a failed send is logged and counted, never recorded, so the pair is
/// retried on the next run. One recipient's failure never aborts delivery
/// to the rest.
///
/// # Clock injection
/// `dispatch` takes the delivery date as a parameter rather than reading
/// the clock, which keeps ledger records deterministic in tests.

use chrono::NaiveDate;
use std::time::Duration;

use crate::ledger::LedgerStore;
use crate::logging::{self, Component};
use crate::model::{Alert, DeliveryRecord, DispatchReport, LedgerError, RecipientSubscription, SendError};

// ---------------------------------------------------------------------------
// Message rendering
// ---------------------------------------------------------------------------

/// Render the recipient-facing alert text (Telegram HTML).
pub fn render_alert_message(alert: &Alert) -> String {
    format!(
        "🛑 АЛЕРТ: Обнаружена термоточка в торфянике \"{title}\"!\n\
         📍 Координаты в регионе {region}: <a href=\"{map_url}\">{lat:.5}, {lon:.5}</a>\n\
         🚨 Необходимо выездное обследование!\n\
         🔗 <a href=\"{wiki_url}\">Подробности в вики</a>",
        title = alert.title,
        region = alert.region,
        map_url = alert.map_url,
        lat = alert.lat,
        lon = alert.lon,
        wiki_url = alert.wiki_url,
    )
}

// ---------------------------------------------------------------------------
// Send interface
// ---------------------------------------------------------------------------

/// External message transport. The dispatcher only ever sees this
/// interface; Telegram is one implementation.
pub trait MessageSender {
    fn send(&self, chat_id: i64, text: &str) -> Result<(), SendError>;
}

/// Telegram Bot API transport (blocking `sendMessage` with a bounded
/// timeout).
pub struct TelegramSender {
    client: reqwest::blocking::Client,
    token: String,
}

impl TelegramSender {
    pub fn new(token: String, timeout: Duration) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Self { client, token }
    }
}

impl MessageSender for TelegramSender {
    fn send(&self, chat_id: i64, text: &str) -> Result<(), SendError> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.token);
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| SendError { reason: e.to_string() })?;

        if !response.status().is_success() {
            return Err(SendError {
                reason: format!("HTTP {}", response.status()),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Deliver alerts to recipients, consulting and updating the ledger.
///
/// Ledger failures propagate (fail closed); send failures are contained
/// per pair. The caller is responsible for persisting the ledger after
/// this returns, on both the success and the error path.
pub fn dispatch(
    alerts: &[Alert],
    recipients: &[RecipientSubscription],
    ledger: &mut dyn LedgerStore,
    sender: &dyn MessageSender,
    today: NaiveDate,
) -> Result<DispatchReport, LedgerError> {
    let mut report = DispatchReport::default();

    if alerts.is_empty() {
        logging::info(Component::Telegram, None, "no alerts to deliver");
        return Ok(report);
    }

    let date = today.format("%Y-%m-%d").to_string();

    for alert in alerts {
        let message = render_alert_message(alert);

        for recipient in recipients {
            if !recipient.regions.is_empty() && !recipient.regions.contains(&alert.region) {
                report.skipped_region += 1;
                continue;
            }

            if ledger.was_sent(alert.id, recipient.chat_id)? {
                report.skipped_dedup += 1;
                logging::debug(
                    Component::Telegram,
                    Some(&recipient.chat_id.to_string()),
                    &format!("alert {} already delivered", alert.id),
                );
                continue;
            }

            match sender.send(recipient.chat_id, &message) {
                Ok(()) => {
                    ledger.record_sent(DeliveryRecord {
                        user_id: recipient.chat_id,
                        alert_id: alert.id,
                        region: alert.region.clone(),
                        title: alert.title.clone(),
                        date: date.clone(),
                        status: "sent".to_string(),
                    })?;
                    report.sent += 1;
                    logging::info(
                        Component::Telegram,
                        Some(&recipient.chat_id.to_string()),
                        &format!("alert {} delivered", alert.id),
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    logging::error(
                        Component::Telegram,
                        Some(&recipient.chat_id.to_string()),
                        &format!("alert {} delivery failed: {}", alert.id, e),
                    );
                }
            }
        }
    }

    Ok(report)
}
