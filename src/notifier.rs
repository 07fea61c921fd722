use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info};

use crate::config::Config;
use crate::error::Result;
use crate::types::TicketInfo;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Best-effort: failures are logged here and never returned.
    async fn notify(&self, ticket_count: usize, tickets: &[TicketInfo]);
}

/// Push via an ntfy-style endpoint, then open the event page locally.
pub struct PushNotifier {
    client: reqwest::Client,
    notify_url: String,
    event_url: String,
    open_browser: bool,
}

impl PushNotifier {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            notify_url: cfg.notify_url.clone(),
            event_url: cfg.event_url.clone(),
            open_browser: cfg.open_browser,
        })
    }

    pub fn build_push_request(&self, ticket_count: usize) -> Result<reqwest::Request> {
        Ok(self
            .client
            .post(&self.notify_url)
            .header("Title", "Ticket Alert")
            .header("Priority", "urgent")
            .header("Tags", "warning,skull")
            .header("Actions", format!("view, Open Ticketmaster, {}", self.event_url))
            .body(push_body(ticket_count))
            .build()?)
    }

    async fn send_push(&self, ticket_count: usize) {
        info!("Sending notification for {ticket_count} tickets found");
        let request = match self.build_push_request(ticket_count) {
            Ok(r) => r,
            Err(e) => {
                error!("Error building web notification: {e}");
                return;
            }
        };

        match self.client.execute(request).await {
            Ok(resp) if resp.status().is_success() => info!("Web notification sent successfully"),
            Ok(resp) => error!(
                status = resp.status().as_u16(),
                "Failed to send notification: {}",
                resp.status().canonical_reason().unwrap_or("unknown status")
            ),
            Err(e) => error!("Error sending web notification: {e}"),
        }
    }

    /// Spawns the platform opener and returns immediately; the exit status is logged later.
    fn open_event_page(&self) {
        let (program, args) = viewer_command(&self.event_url);
        let spawned = tokio::process::Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(mut child) => {
                tokio::spawn(async move {
                    match child.wait().await {
                        Ok(status) if status.success() => info!("Opened browser to event page"),
                        Ok(status) => error!("Error opening browser: {program} exited with {status}"),
                        Err(e) => error!("Error opening browser: {e}"),
                    }
                });
            }
            Err(e) => error!("Error attempting to open browser: {e}"),
        }
    }
}

#[async_trait]
impl Notifier for PushNotifier {
    async fn notify(&self, ticket_count: usize, tickets: &[TicketInfo]) {
        info!("{}", summary_message(ticket_count, tickets));
        self.send_push(ticket_count).await;
        if self.open_browser {
            self.open_event_page();
        }
    }
}

pub fn push_body(ticket_count: usize) -> String {
    format!("Found {ticket_count} tickets!")
}

/// Count line followed by one line per listing.
pub fn summary_message(ticket_count: usize, tickets: &[TicketInfo]) -> String {
    format!(
        "Found {ticket_count} resale ticket(s) available!\n{}",
        format_ticket_details(tickets)
    )
}

/// One line per listing: whichever of section, row and price are present, in that order.
pub fn format_ticket_details(tickets: &[TicketInfo]) -> String {
    tickets
        .iter()
        .map(|t| {
            let mut parts = Vec::new();
            if let Some(section) = &t.section {
                parts.push(section.clone());
            }
            if let Some(row) = &t.row {
                parts.push(format!("Row {row}"));
            }
            if let Some(price) = &t.price {
                parts.push(price.clone());
            }
            parts.join(", ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// OS command that opens `url` in the default application.
pub fn viewer_command(url: &str) -> (&'static str, Vec<String>) {
    if cfg!(target_os = "macos") {
        ("open", vec![url.to_string()])
    } else if cfg!(target_os = "windows") {
        ("cmd", vec!["/C".to_string(), "start".to_string(), String::new(), url.to_string()])
    } else {
        ("xdg-open", vec![url.to_string()])
    }
}
