//! Chart-ready series built from a session history.
//!
//! Four kinds are supported: `progress` (minutes per practiced day),
//! `types` (minutes per meditation type), `weekly` and `monthly` (minutes per
//! bucket). Asking for anything else yields an explicit unsupported chart,
//! and a user without sessions gets an explicit empty chart.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;

use super::daily::DailyTotals;
use super::insights::round2;
use super::periods::{group_by_month, group_by_week};
use crate::types::Session;

/// Colors assigned to meditation types, in order.
pub const TYPE_PALETTE: [&str; 5] = ["#4F46E5", "#059669", "#DC2626", "#D97706", "#7C3AED"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    Progress,
    Types,
    Weekly,
    Monthly,
}

impl ChartKind {
    pub const ALL: [ChartKind; 4] = [
        ChartKind::Progress,
        ChartKind::Types,
        ChartKind::Weekly,
        ChartKind::Monthly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Progress => "progress",
            ChartKind::Types => "types",
            ChartKind::Weekly => "weekly",
            ChartKind::Monthly => "monthly",
        }
    }
}

impl std::str::FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "progress" => Ok(ChartKind::Progress),
            "types" => Ok(ChartKind::Types),
            "weekly" => Ok(ChartKind::Weekly),
            "monthly" => Ok(ChartKind::Monthly),
            _ => Err(format!("unsupported chart type: {}", s)),
        }
    }
}

/// How a chart should be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartStyle {
    Line,
    Pie,
    Bar,
    /// No sessions to plot
    Empty,
    /// The requested kind does not exist
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub x: String,
    pub y: i64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub chart_type: ChartStyle,
    pub title: String,
    pub data: Vec<ChartPoint>,
    /// Axis labels, or slice labels for pie charts
    pub labels: Vec<String>,
    pub colors: Vec<String>,
    pub metadata: serde_json::Value,
}

impl Chart {
    pub fn empty() -> Self {
        Self {
            chart_type: ChartStyle::Empty,
            title: "No data available".to_string(),
            data: Vec::new(),
            labels: Vec::new(),
            colors: Vec::new(),
            metadata: json!({ "message": "No sessions to chart yet" }),
        }
    }

    pub fn unsupported(kind: &str) -> Self {
        Self {
            chart_type: ChartStyle::Unsupported,
            title: "Unsupported chart type".to_string(),
            data: Vec::new(),
            labels: Vec::new(),
            colors: Vec::new(),
            metadata: json!({
                "error": format!("Chart type '{}' is not supported", kind),
                "supported": ChartKind::ALL.iter().map(|k| k.as_str()).collect::<Vec<_>>(),
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn mean(values: &[i64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<i64>() as f64 / values.len() as f64
}

/// Index of the largest value; the first one on ties.
fn first_max(values: &[i64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, i64)>, (i, v)| match best {
            Some((_, b)) if b >= *v => best,
            _ => Some((i, *v)),
        })
        .map(|(i, _)| i)
}

/// Build the chart `kind` names from `sessions`.
///
/// The kind is checked first, so an unknown kind is reported as unsupported
/// even for users without sessions.
pub fn build_chart(sessions: &[Session], kind: &str) -> Chart {
    let Ok(kind) = kind.parse::<ChartKind>() else {
        return Chart::unsupported(kind);
    };

    if sessions.is_empty() {
        return Chart::empty();
    }

    match kind {
        ChartKind::Progress => progress_chart(sessions),
        ChartKind::Types => types_chart(sessions),
        ChartKind::Weekly => weekly_chart(sessions),
        ChartKind::Monthly => monthly_chart(sessions),
    }
}

fn progress_chart(sessions: &[Session]) -> Chart {
    let daily = DailyTotals::from_sessions(sessions);
    let data: Vec<ChartPoint> = daily
        .iter()
        .map(|(day, total)| ChartPoint {
            x: day.format("%Y-%m-%d").to_string(),
            y: total.minutes,
            label: format!("{} min", total.minutes),
        })
        .collect();
    let minutes: Vec<i64> = data.iter().map(|p| p.y).collect();

    Chart {
        chart_type: ChartStyle::Line,
        title: "Daily Meditation Progress".to_string(),
        labels: strings(&["Date", "Minutes"]),
        colors: strings(&[TYPE_PALETTE[0]]),
        metadata: json!({
            "total_days": data.len(),
            "avg_minutes": round2(mean(&minutes)),
        }),
        data,
    }
}

fn types_chart(sessions: &[Session]) -> Chart {
    let mut totals: BTreeMap<&str, i64> = BTreeMap::new();
    for s in sessions {
        *totals.entry(s.type_name()).or_insert(0) += s.duration_completed;
    }

    let data: Vec<ChartPoint> = totals
        .iter()
        .map(|(name, minutes)| ChartPoint {
            x: name.to_string(),
            y: *minutes,
            label: format!("{}: {} min", name, minutes),
        })
        .collect();
    let minutes: Vec<i64> = data.iter().map(|p| p.y).collect();
    let most_used = first_max(&minutes).map(|i| data[i].x.clone());

    Chart {
        chart_type: ChartStyle::Pie,
        title: "Meditation Type Distribution".to_string(),
        labels: data.iter().map(|p| p.x.clone()).collect(),
        colors: strings(&TYPE_PALETTE[..totals.len().min(TYPE_PALETTE.len())]),
        metadata: json!({
            "total_types": data.len(),
            "most_used": most_used,
            "total_minutes": minutes.iter().sum::<i64>(),
        }),
        data,
    }
}

fn weekly_chart(sessions: &[Session]) -> Chart {
    let weeks = group_by_week(sessions);
    let data: Vec<ChartPoint> = weeks
        .iter()
        .map(|w| {
            let label = w.label();
            ChartPoint {
                label: format!("Week {}: {} min", label, w.total_minutes),
                x: label,
                y: w.total_minutes,
            }
        })
        .collect();
    let minutes: Vec<i64> = data.iter().map(|p| p.y).collect();
    let best_week = first_max(&minutes).map(|i| data[i].x.clone());

    Chart {
        chart_type: ChartStyle::Bar,
        title: "Minutes per Week".to_string(),
        labels: strings(&["Week", "Minutes"]),
        colors: strings(&[TYPE_PALETTE[1]]),
        metadata: json!({
            "total_weeks": data.len(),
            "avg_weekly": round2(mean(&minutes)),
            "best_week": best_week,
        }),
        data,
    }
}

fn monthly_chart(sessions: &[Session]) -> Chart {
    let months = group_by_month(sessions);
    let data: Vec<ChartPoint> = months
        .iter()
        .map(|m| {
            let label = m.label();
            ChartPoint {
                label: format!("{}: {} min", label, m.total_minutes),
                x: label,
                y: m.total_minutes,
            }
        })
        .collect();
    let minutes: Vec<i64> = data.iter().map(|p| p.y).collect();
    let growth_trend = match (minutes.first(), minutes.last()) {
        (Some(first), Some(last)) if last > first => "improving",
        _ => "stable",
    };

    Chart {
        chart_type: ChartStyle::Bar,
        title: "Minutes per Month".to_string(),
        labels: strings(&["Month", "Minutes"]),
        colors: strings(&[TYPE_PALETTE[2]]),
        metadata: json!({
            "total_months": data.len(),
            "avg_monthly": round2(mean(&minutes)),
            "growth_trend": growth_trend,
        }),
        data,
    }
}
