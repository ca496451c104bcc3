//! Plain-text rendering for CLI output.

use std::fmt::{self, Write};
use std::path::Path;

use ticketflow_core::analytics::{Dashboard, Interval};
use ticketflow_core::fetch::IssuePageSource;
use ticketflow_core::{Config, DashboardService, DataSource, Dataset, RefreshReport};

/// One-line summary of a refresh
pub fn refresh_line(report: &RefreshReport) -> String {
    let snapshot = &report.snapshot;
    let mut line = match report.source {
        DataSource::Live => format!(
            "{}: fetched {} of {} tickets in {} page(s)",
            report.dataset,
            snapshot.tickets.iter().filter(|t| !t.historical).count(),
            snapshot.server_total,
            report.pages
        ),
        DataSource::Cache => format!(
            "{}: served {} cached tickets from {}",
            report.dataset,
            snapshot.tickets.len(),
            snapshot.fetched_at.format("%Y-%m-%d %H:%M UTC")
        ),
    };

    if let Some(save) = &report.save {
        match &save.merged_info {
            Some(info) => line.push_str(&format!(
                ", {} ({} total, {} historical)",
                save.reason.as_str(),
                info.total_merged,
                info.historical_tickets
            )),
            None => line.push_str(&format!(", {}", save.reason.as_str())),
        }
    }
    if snapshot.truncated {
        line.push_str(", truncated");
    }
    if let Some(warning) = &report.warning {
        line.push_str(&format!(" [warning: {}]", warning));
    }
    line
}

/// Counts, one interval's period tables, and the label legend
pub fn render_text(dataset: Dataset, dashboard: &Dashboard, interval: Interval) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = write_text(&mut out, dataset, dashboard, interval);
    out
}

fn write_text(
    out: &mut String,
    dataset: Dataset,
    dashboard: &Dashboard,
    interval: Interval,
) -> fmt::Result {
    let counts = &dashboard.counts;
    writeln!(out, "Dataset: {} ({} tickets cached)", dataset, dashboard.tickets.len())?;
    writeln!(
        out,
        "Active:  {} total | high {} | medium {} | low {} | unknown {}",
        counts.total, counts.high, counts.medium, counts.low, counts.unknown
    )?;
    writeln!(out, "Flow:    {} incoming | {} outgoing", counts.incoming, counts.outgoing)?;

    writeln!(out)?;
    writeln!(out, "Tickets by priority ({}):", interval)?;
    writeln!(
        out,
        "  {:<12} {:>6} {:>6} {:>6} {:>7} {:>6}",
        "Period", "High", "Medium", "Low", "Unknown", "Total"
    )?;
    for period in dashboard.time_series.get(interval) {
        writeln!(
            out,
            "  {:<12} {:>6} {:>6} {:>6} {:>7} {:>6}",
            period.date, period.high, period.medium, period.low, period.unknown, period.total
        )?;
    }

    writeln!(out)?;
    writeln!(out, "Average age in days ({}):", interval)?;
    writeln!(
        out,
        "  {:<12} {:>6} {:>6} {:>6} {:>7}",
        "Period", "High", "Medium", "Low", "Unknown"
    )?;
    for period in dashboard.average_age.get(interval) {
        writeln!(
            out,
            "  {:<12} {:>6} {:>6} {:>6} {:>7}",
            period.date, period.high, period.medium, period.low, period.unknown
        )?;
    }

    writeln!(out)?;
    if dashboard.source_labels.summary.is_empty() {
        writeln!(out, "Source labels: none")?;
    } else {
        writeln!(out, "Source labels:")?;
        for label in &dashboard.source_labels.summary {
            writeln!(
                out,
                "  {:<24} {:>5} {:>6.1}%",
                label.name, label.count, label.percentage
            )?;
        }
    }
    Ok(())
}

/// Configuration, credentials and cache contents
pub async fn render_status<S: IssuePageSource>(
    service: &DashboardService<S>,
    config_path: &Path,
) -> String {
    let config = service.config();
    let store = service.store();
    let mut out = String::new();

    let found = if config_path.exists() {
        "found"
    } else {
        "not found, using defaults"
    };
    out.push_str(&format!("Config:     {} ({})\n", config_path.display(), found));

    let jira = &config.jira;
    if jira.is_ready() {
        out.push_str(&format!(
            "Jira:       {} as {}\n",
            jira.base_url.as_deref().unwrap_or_default(),
            jira.email.as_deref().unwrap_or_default()
        ));
    } else {
        out.push_str("Jira:       not configured (cache only)\n");
    }
    out.push_str(&format!("Query:      {}\n", jira.jql));
    out.push_str(&format!(
        "Historical: {}\n",
        jira.historical_jql.as_deref().unwrap_or("(not set)")
    ));

    let keys = store.keys();
    out.push_str(&format!(
        "Cache:      {} ({} snapshot file(s))\n",
        store.dir().display(),
        keys.len()
    ));
    if keys.is_empty() {
        out.push_str("  (no snapshots)\n");
    }
    for key in &keys {
        match store.load(key).await {
            Some(snapshot) => {
                let historical = snapshot.tickets.iter().filter(|t| t.historical).count();
                out.push_str(&format!(
                    "  {:<20} {} tickets ({} historical), fetched {}{}\n",
                    key,
                    snapshot.tickets.len(),
                    historical,
                    snapshot.fetched_at.to_rfc3339(),
                    if snapshot.truncated { ", truncated" } else { "" }
                ));
            }
            None => out.push_str(&format!("  {:<20} (unreadable)\n", key)),
        }
    }

    out.push_str(&format!("Logs:       {}\n", Config::log_path().display()));
    out
}
