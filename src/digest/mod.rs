//! Daily digest assembly and delivery.
//!
//! Collects episodes annotated since the last successful send, renders a
//! plain-text and minimal HTML digest, and hands it to an HTTP mail relay.
//! The relay is an opaque collaborator: JSON POST in, 2xx out. Delivery is
//! best-effort; a failed send is logged and the window is retried in full at
//! the next trigger.

use crate::config::DigestConfig;
use crate::db::{Database, DigestEpisodeRow};
use crate::error::{Error, Result};
use crate::types::{DigestReport, Event};
use chrono::{TimeZone, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Payload sent to the mail relay
#[derive(Debug, Serialize)]
struct MailPayload {
    from: String,
    to: Vec<String>,
    subject: String,
    text: String,
    html: String,
}

/// Assembles and sends episode digests
pub struct DigestSender {
    db: Arc<Database>,
    config: DigestConfig,
    client: reqwest::Client,
    events: broadcast::Sender<Event>,
}

impl DigestSender {
    /// Create a new digest sender
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(
        db: Arc<Database>,
        config: DigestConfig,
        events: broadcast::Sender<Event>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.relay_timeout)
            .build()
            .map_err(|e| Error::Digest(format!("Failed to create relay HTTP client: {}", e)))?;

        Ok(Self {
            db,
            config,
            client,
            events,
        })
    }

    /// Assemble and send the digest for the window since the last successful send
    ///
    /// An empty window sends nothing but is still logged. A failed relay call
    /// is recorded without advancing the window, so the same episodes are
    /// included in the next attempt.
    pub async fn send_digest(&self) -> Result<DigestReport> {
        let window_start = self.db.last_successful_digest().await?.unwrap_or(0);
        let window_end = Utc::now().timestamp();

        let episodes = self
            .db
            .get_digest_episodes(window_start, window_end)
            .await?;

        if episodes.is_empty() {
            info!("No newly annotated episodes, skipping digest");
            // Logged so the window advances, but nothing was mailed, so no
            // DigestSent event is broadcast
            self.db
                .record_digest(window_start, window_end, 0, true, None)
                .await?;
            return Ok(DigestReport {
                episodes: 0,
                window_start: timestamp_to_datetime(window_start),
                window_end: timestamp_to_datetime(window_end),
                sent: false,
            });
        }

        if self.config.relay_url.is_none() || self.config.recipients.is_empty() {
            warn!("Digest has episodes but no relay or recipients configured");
            let reason = "no relay or recipients configured";
            self.db
                .record_digest(
                    window_start,
                    window_end,
                    episodes.len() as i64,
                    false,
                    Some(reason),
                )
                .await?;
            let _ = self.events.send(Event::DigestFailed {
                error: reason.to_string(),
            });
            return Err(Error::Digest(reason.to_string()));
        }

        let subject = format!(
            "{} — {}",
            self.config.subject_prefix,
            Utc::now().format("%Y-%m-%d")
        );
        let text = render_text(&episodes);
        let html = render_html(&episodes);

        match self.post_to_relay(&subject, text, html).await {
            Ok(()) => {
                info!(episodes = episodes.len(), "Digest sent");
                self.db
                    .record_digest(window_start, window_end, episodes.len() as i64, true, None)
                    .await?;
                let report = DigestReport {
                    episodes: episodes.len(),
                    window_start: timestamp_to_datetime(window_start),
                    window_end: timestamp_to_datetime(window_end),
                    sent: true,
                };
                let _ = self.events.send(Event::DigestSent {
                    report: report.clone(),
                });
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, "Digest delivery failed");
                self.db
                    .record_digest(
                        window_start,
                        window_end,
                        episodes.len() as i64,
                        false,
                        Some(&e.to_string()),
                    )
                    .await?;
                let _ = self.events.send(Event::DigestFailed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// POST the rendered digest to the mail relay
    async fn post_to_relay(&self, subject: &str, text: String, html: String) -> Result<()> {
        // Checked by the caller
        let relay_url = self
            .config
            .relay_url
            .as_deref()
            .ok_or_else(|| Error::Digest("no relay configured".to_string()))?;

        let payload = MailPayload {
            from: self.config.from.clone(),
            to: self.config.recipients.clone(),
            subject: subject.to_string(),
            text,
            html,
        };

        debug!(url = %relay_url, recipients = payload.to.len(), "Posting digest to relay");

        let mut request = self.client.post(relay_url).json(&payload);
        if let Some(api_key) = &self.config.relay_api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Digest(format!("relay request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Digest(format!(
                "relay returned HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        Ok(())
    }
}

/// Convert a Unix timestamp to a UTC datetime
fn timestamp_to_datetime(ts: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(ts, 0).single().unwrap_or_else(Utc::now)
}

/// Render the plain-text digest body
fn render_text(episodes: &[DigestEpisodeRow]) -> String {
    let mut body = format!("{} new episode(s) annotated:\n\n", episodes.len());

    for episode in episodes {
        body.push_str(&format!("## {} — {}\n", episode.podcast_title, episode.title));
        if let Some(annotated_at) = episode.annotated_at {
            if let Some(dt) = Utc.timestamp_opt(annotated_at, 0).single() {
                body.push_str(&format!("Annotated {}\n", dt.format("%Y-%m-%d %H:%M UTC")));
            }
        }
        body.push('\n');
        body.push_str(episode.summary.as_deref().unwrap_or("(no summary)"));
        body.push_str("\n\n");
    }

    body
}

/// Render the HTML digest body (deliberately minimal)
fn render_html(episodes: &[DigestEpisodeRow]) -> String {
    let mut body = String::from("<html><body>\n");
    body.push_str(&format!(
        "<p>{} new episode(s) annotated:</p>\n",
        episodes.len()
    ));

    for episode in episodes {
        body.push_str(&format!(
            "<h2>{} &mdash; {}</h2>\n<p>{}</p>\n",
            escape_html(&episode.podcast_title),
            escape_html(&episode.title),
            escape_html(episode.summary.as_deref().unwrap_or("(no summary)")),
        ));
    }

    body.push_str("</body></html>\n");
    body
}

/// Minimal HTML escaping for digest content
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
