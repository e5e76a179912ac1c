//! Output formatting, cycle notifications and alerting

use crate::error::ScanResult;
use crate::network::{NetworkRecord, SecurityLevel};
use async_trait::async_trait;
use colored::*;
use log::warn;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Identifiers listed in an alert body before the remainder is summarised
pub const ALERT_PREVIEW_LIMIT: usize = 3;

/// Emitted once per foreground cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CycleEvent {
    /// Full merged batch plus the subset not yet in the store
    Completed {
        merged: Vec<NetworkRecord>,
        new_networks: Vec<NetworkRecord>,
        persisted: usize,
    },
    /// Acquisition failed; observers still receive an (empty) tick
    Failed { error: String },
}

impl CycleEvent {
    pub fn merged(&self) -> &[NetworkRecord] {
        match self {
            CycleEvent::Completed { merged, .. } => merged,
            CycleEvent::Failed { .. } => &[],
        }
    }

    pub fn new_networks(&self) -> &[NetworkRecord] {
        match self {
            CycleEvent::Completed { new_networks, .. } => new_networks,
            CycleEvent::Failed { .. } => &[],
        }
    }
}

/// Real-time notification manager
#[derive(Debug, Clone)]
pub struct NotificationManager {
    sender: broadcast::Sender<CycleEvent>,
}

impl NotificationManager {
    pub fn new(buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_size);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CycleEvent> {
        self.sender.subscribe()
    }

    /// Send to current subscribers; dropped silently when nobody listens
    pub fn notify(&self, event: CycleEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for NotificationManager {
    fn default() -> Self {
        Self::new(16)
    }
}

/// Insecure networks found by a background pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    pub networks: Vec<NetworkRecord>,
}

impl AlertPayload {
    /// Keep only the DANGEROUS records; `None` when there are none
    pub fn from_new_networks(new_networks: &[NetworkRecord]) -> Option<Self> {
        let networks: Vec<NetworkRecord> = new_networks
            .iter()
            .filter(|r| r.label.is_dangerous())
            .cloned()
            .collect();
        if networks.is_empty() {
            None
        } else {
            Some(Self { networks })
        }
    }

    pub fn title(&self) -> String {
        format!("WiFi Insecure Detected - {} network(s)", self.networks.len())
    }

    pub fn body(&self) -> String {
        let mut lines: Vec<String> = self
            .networks
            .iter()
            .take(ALERT_PREVIEW_LIMIT)
            .map(|r| r.ssid.clone())
            .collect();
        if self.networks.len() > ALERT_PREVIEW_LIMIT {
            lines.push(format!("...and {} others", self.networks.len() - ALERT_PREVIEW_LIMIT));
        }
        lines.join("\n")
    }
}

/// Receiver of insecure-network alerts (platform notifier)
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send_alert(&self, payload: &AlertPayload, vibrate: bool) -> ScanResult<()>;
}

/// Prints alerts to stderr
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleAlertSink;

#[async_trait]
impl AlertSink for ConsoleAlertSink {
    async fn send_alert(&self, payload: &AlertPayload, vibrate: bool) -> ScanResult<()> {
        eprintln!("{} {}", "[!]".bright_red().bold(), payload.title().bright_red().bold());
        for line in payload.body().lines() {
            eprintln!("    {}", line);
        }
        if vibrate {
            warn!("Vibration requested but not supported on this console");
        }
        Ok(())
    }
}

/// Colored label for terminal output
pub fn colored_level(level: SecurityLevel) -> ColoredString {
    level.as_str().color(level.color()).bold()
}

/// Table of records for `list` and the foreground loop
pub fn format_records(records: &[NetworkRecord], colored_output: bool) -> String {
    let mut out = String::new();
    let header = format!(
        "{:<32} {:<18} {:>5} {:>6} {:>4} {:<10} {}",
        "SSID", "BSSID", "RSSI", "FREQ", "CH", "LEVEL", "SEEN"
    );
    if colored_output {
        out.push_str(&header.bright_white().bold().to_string());
    } else {
        out.push_str(&header);
    }
    out.push('\n');

    for r in records {
        let level = if colored_output {
            format!("{:<10}", colored_level(r.label))
        } else {
            format!("{:<10}", r.label.as_str())
        };
        out.push_str(&format!(
            "{:<32} {:<18} {:>5} {:>6} {:>4} {} {}\n",
            truncate(&r.ssid, 32),
            r.bssid,
            r.rssi,
            r.frequency,
            r.channel,
            level,
            r.timestamp_formatted
        ));
    }
    out
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        value.to_string()
    } else {
        let mut s: String = value.chars().take(max - 1).collect();
        s.push('…');
        s
    }
}

/// One-line summary of a foreground tick
pub fn format_cycle_summary(event: &CycleEvent) -> String {
    match event {
        CycleEvent::Completed { merged, new_networks, persisted } => {
            let dangerous = merged.iter().filter(|r| r.label.is_dangerous()).count();
            format!(
                "{} networks in range, {} new, {} dangerous, {} saved",
                merged.len(),
                new_networks.len(),
                dangerous,
                persisted
            )
        }
        CycleEvent::Failed { error } => format!("scan failed: {}", error),
    }
}
