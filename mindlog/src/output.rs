//! Text and JSON rendering of command results.

use anyhow::Result;
use mindlog_core::analytics::{
    AnalyticsSnapshot, Chart, ChartStyle, MonthlyBucket, ProgressReport, RefreshReport,
    WeeklyBucket,
};
use mindlog_core::{Meditation, MeditationType, Session, User, UserPreferences, UserStatsSummary};
use serde::Serialize;

use crate::OutputFormat;

pub struct Printer {
    format: OutputFormat,
}

impl Printer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Informational line for text output; JSON output stays machine-readable.
    pub fn note(&self, message: &str) {
        if !self.is_json() {
            println!("{}", message);
        }
    }

    pub fn created<T: Serialize>(&self, what: &str, id: i64, value: &T) -> Result<()> {
        if self.is_json() {
            return self.json(value);
        }
        println!("Created {} {}", what, id);
        Ok(())
    }

    pub fn updated<T: Serialize>(&self, what: &str, id: i64, value: &T) -> Result<()> {
        if self.is_json() {
            return self.json(value);
        }
        println!("Updated {} {}", what, id);
        Ok(())
    }

    pub fn deleted(&self, what: &str, id: i64) -> Result<()> {
        if self.is_json() {
            return self.json(&serde_json::json!({ "deleted": what, "id": id }));
        }
        println!("Deleted {} {}", what, id);
        Ok(())
    }

    pub fn users(&self, users: &[User]) -> Result<()> {
        if self.is_json() {
            return self.json(users);
        }
        if users.is_empty() {
            println!("No users. Add one with 'mindlog user add <email>'.");
            return Ok(());
        }
        println!("{:<6} {:<32} {:<6} {:<8}", "ID", "EMAIL", "ROLE", "ACTIVE");
        println!("{}", "-".repeat(55));
        for user in users {
            println!(
                "{:<6} {:<32} {:<6} {:<8}",
                user.id,
                truncate(&user.email, 32),
                user.role.as_str(),
                if user.is_active { "yes" } else { "no" }
            );
        }
        Ok(())
    }

    pub fn meditation_types(&self, types: &[MeditationType]) -> Result<()> {
        if self.is_json() {
            return self.json(types);
        }
        if types.is_empty() {
            println!("No meditation types.");
            return Ok(());
        }
        println!("{:<6} {:<20} {:<12} TAGS", "ID", "NAME", "RANGE");
        println!("{}", "-".repeat(60));
        for kind in types {
            println!(
                "{:<6} {:<20} {:<12} {}",
                kind.id,
                truncate(&kind.name, 20),
                kind.duration_range.as_deref().unwrap_or("-"),
                kind.tags.join(", ")
            );
        }
        Ok(())
    }

    pub fn meditations(&self, meditations: &[Meditation]) -> Result<()> {
        if self.is_json() {
            return self.json(meditations);
        }
        if meditations.is_empty() {
            println!("No meditations.");
            return Ok(());
        }
        println!(
            "{:<6} {:<28} {:>5} {:<13} {:<6}",
            "ID", "TITLE", "MIN", "DIFFICULTY", "TYPE"
        );
        println!("{}", "-".repeat(62));
        for m in meditations {
            println!(
                "{:<6} {:<28} {:>5} {:<13} {:<6}",
                m.id,
                truncate(&m.title, 28),
                m.duration,
                m.difficulty.as_str(),
                m.type_id.map(|t| t.to_string()).unwrap_or_else(|| "-".into())
            );
        }
        Ok(())
    }

    pub fn sessions(&self, sessions: &[Session]) -> Result<()> {
        if self.is_json() {
            return self.json(sessions);
        }
        if sessions.is_empty() {
            println!("No sessions logged.");
            return Ok(());
        }
        println!("{:<6} {:<19} {:>5} {:<20}", "ID", "DATE", "MIN", "TYPE");
        println!("{}", "-".repeat(53));
        for s in sessions {
            println!(
                "{:<6} {:<19} {:>5} {:<20}",
                s.id,
                s.date.format("%Y-%m-%d %H:%M:%S"),
                s.duration_completed,
                truncate(s.type_name(), 20)
            );
        }
        Ok(())
    }

    pub fn session(&self, session: &Session) -> Result<()> {
        if self.is_json() {
            return self.json(session);
        }
        println!("Session {}", session.id);
        println!("  Date:       {}", session.date.format("%Y-%m-%d %H:%M:%S"));
        println!("  Minutes:    {}", session.duration_completed);
        println!("  Meditation: {}", session.meditation_id);
        println!("  Type:       {}", session.type_name());
        if !session.tags.is_empty() {
            println!("  Tags:       {}", session.tags.join(", "));
        }
        Ok(())
    }

    pub fn summary(&self, summary: &UserStatsSummary) -> Result<()> {
        if self.is_json() {
            return self.json(summary);
        }
        println!("Stats for user {}", summary.user_id);
        println!("{}", "=".repeat(24));
        println!("Total minutes:    {}", summary.total_minutes);
        println!("Total sessions:   {}", summary.total_sessions);
        println!("Average session:  {:.2} min", summary.average_session_duration);
        println!("Current streak:   {} days", summary.current_streak);
        println!("Longest streak:   {} days", summary.longest_streak);
        println!(
            "Last updated:     {}",
            summary.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
        );
        Ok(())
    }

    pub fn summaries(&self, summaries: &[UserStatsSummary]) -> Result<()> {
        if self.is_json() {
            return self.json(summaries);
        }
        if summaries.is_empty() {
            println!("No stored summaries.");
            return Ok(());
        }
        println!(
            "{:<8} {:>8} {:>9} {:>8} {:>8}",
            "USER", "MINUTES", "SESSIONS", "CURRENT", "LONGEST"
        );
        println!("{}", "-".repeat(45));
        for s in summaries {
            println!(
                "{:<8} {:>8} {:>9} {:>8} {:>8}",
                s.user_id, s.total_minutes, s.total_sessions, s.current_streak, s.longest_streak
            );
        }
        Ok(())
    }

    pub fn refresh_report(&self, report: &RefreshReport) -> Result<()> {
        if self.is_json() {
            return self.json(report);
        }
        println!("Refreshed stats for {} user(s)", report.refreshed);
        if !report.failed.is_empty() {
            println!("Failed for {} user(s):", report.failed.len());
            for failure in &report.failed {
                println!("  user {}: {}", failure.user_id, failure.error);
            }
        }
        Ok(())
    }

    pub fn analysis(&self, snapshot: &AnalyticsSnapshot) -> Result<()> {
        if self.is_json() {
            return self.json(snapshot);
        }
        println!("Analysis for user {}", snapshot.user_id);
        println!("{}", "=".repeat(27));
        println!("Sessions:             {}", snapshot.total_sessions);
        println!("Total minutes:        {}", snapshot.total_minutes);
        println!(
            "Averages:             {:.2}/day  {:.2}/week  {:.2}/month",
            snapshot.daily_average, snapshot.weekly_average, snapshot.monthly_average
        );
        println!("Most active day:      {}", snapshot.most_active_day);
        println!("Most active hour:     {:02}:00", snapshot.most_active_hour);
        println!("Typical length:       {}", snapshot.preferred_duration);
        println!("Most used type:       {}", snapshot.most_used_type);
        println!(
            "Last 7 days:          {} min ({:+.2}%)",
            snapshot.last_7_days_minutes, snapshot.growth_rate_7d
        );
        println!(
            "Last 30 days:         {} min ({:+.2}%)",
            snapshot.last_30_days_minutes, snapshot.growth_rate_30d
        );
        println!(
            "Consistency:          {:.2}% ({} active days)",
            snapshot.consistency_score, snapshot.active_days_last_month
        );
        println!("Longest gap:          {} days", snapshot.longest_gap_days);
        if !snapshot.meditation_type_distribution.is_empty() {
            println!();
            println!("Sessions by type:");
            for (name, count) in &snapshot.meditation_type_distribution {
                println!("  {:<20} {}", name, count);
            }
        }
        Ok(())
    }

    pub fn weekly(&self, weeks: &[WeeklyBucket]) -> Result<()> {
        if self.is_json() {
            return self.json(weeks);
        }
        if weeks.is_empty() {
            println!("No sessions in this window.");
            return Ok(());
        }
        println!(
            "{:<23} {:>7} {:>9} {:>8} {:>5}  {}",
            "WEEK", "MINUTES", "SESSIONS", "AVERAGE", "DAYS", "TOP TYPE"
        );
        for w in weeks {
            println!(
                "{:<23} {:>7} {:>9} {:>8.2} {:>5}  {}",
                w.label(),
                w.total_minutes,
                w.total_sessions,
                w.average_duration,
                w.days_practiced,
                w.most_used_type
            );
        }
        Ok(())
    }

    pub fn monthly(&self, months: &[MonthlyBucket]) -> Result<()> {
        if self.is_json() {
            return self.json(months);
        }
        if months.is_empty() {
            println!("No sessions in this window.");
            return Ok(());
        }
        println!(
            "{:<15} {:>7} {:>9} {:>8} {:>5} {:>7}  {}",
            "MONTH", "MINUTES", "SESSIONS", "AVERAGE", "DAYS", "STREAK", "TOP TYPE"
        );
        for m in months {
            println!(
                "{:<15} {:>7} {:>9} {:>8.2} {:>5} {:>7}  {}",
                format!("{} {}", m.month_name, m.year),
                m.total_minutes,
                m.total_sessions,
                m.average_duration,
                m.days_practiced,
                m.streak_days,
                m.most_used_type
            );
        }
        Ok(())
    }

    pub fn progress(&self, report: &ProgressReport) -> Result<()> {
        if self.is_json() {
            return self.json(report);
        }
        println!("Progress over the last {} days", report.period_days);
        println!("{}", "=".repeat(34));
        println!("Total minutes:    {}", report.total_minutes);
        println!("Sessions:         {}", report.total_sessions);
        println!("Daily average:    {:.2} min", report.average_daily_minutes);
        println!("Consistency:      {:.2}%", report.consistency_percentage);
        println!("Trend:            {}", report.improvement_trend.as_str());
        match report.best_day {
            Some(day) => println!(
                "Best day:         {} ({} min)",
                day.format("%Y-%m-%d"),
                report.best_day_minutes
            ),
            None => println!("Best day:         -"),
        }
        println!(
            "Types practiced:  {}",
            if report.meditation_types_used.is_empty() {
                "-".to_string()
            } else {
                report.meditation_types_used.join(", ")
            }
        );
        println!("Favorite time:    {}", report.favorite_time_slot);
        Ok(())
    }

    pub fn chart(&self, chart: &Chart) -> Result<()> {
        if self.is_json() {
            return self.json(chart);
        }
        println!("{}", chart.title);
        match chart.chart_type {
            ChartStyle::Empty | ChartStyle::Unsupported => {
                if let Some(text) = chart
                    .metadata
                    .get("message")
                    .or_else(|| chart.metadata.get("error"))
                    .and_then(|v| v.as_str())
                {
                    println!("{}", text);
                }
                return Ok(());
            }
            _ => {}
        }

        let peak = chart.data.iter().map(|p| p.y).max().unwrap_or(0).max(1);
        for point in &chart.data {
            let width = (point.y * 40 / peak) as usize;
            println!("{:<23} {:>6}  {}", point.x, point.y, "#".repeat(width));
        }
        Ok(())
    }

    pub fn preferences(&self, prefs: Option<&UserPreferences>) -> Result<()> {
        if self.is_json() {
            return self.json(&prefs);
        }
        let Some(prefs) = prefs else {
            println!("No preferences yet. Log a session first.");
            return Ok(());
        };
        println!("Preferred duration: {}", prefs.preferred_duration.as_str());
        println!("Preferred time:     {}", prefs.preferred_time.as_str());
        println!(
            "Goals:              {}",
            if prefs.goals.is_empty() {
                "-".to_string()
            } else {
                prefs.goals.join(", ")
            }
        );
        Ok(())
    }
}

/// Truncate to `max` characters, marking the cut with an ellipsis.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
