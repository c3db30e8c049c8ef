// Widget domain model - the closed catalog of dashboard widget kinds
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WidgetKind {
    KpiCard,
    BarChart,
    LineChart,
    PieChart,
}

/// Grid span a widget gets when first placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WidgetSize {
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown widget kind: {0}")]
pub struct ParseWidgetKindError(pub String);

impl WidgetKind {
    pub const ALL: [WidgetKind; 4] = [
        WidgetKind::KpiCard,
        WidgetKind::BarChart,
        WidgetKind::LineChart,
        WidgetKind::PieChart,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            WidgetKind::KpiCard => "Card",
            WidgetKind::BarChart => "Bar Chart",
            WidgetKind::LineChart => "Line Chart",
            WidgetKind::PieChart => "Pie Chart",
        }
    }

    pub const fn default_size(self) -> WidgetSize {
        match self {
            WidgetKind::KpiCard => WidgetSize { w: 6, h: 6 },
            WidgetKind::BarChart => WidgetSize { w: 12, h: 6 },
            WidgetKind::LineChart => WidgetSize { w: 12, h: 9 },
            WidgetKind::PieChart => WidgetSize { w: 6, h: 8 },
        }
    }

    /// Wire name, as used in persisted widgets and ids.
    pub const fn as_str(self) -> &'static str {
        match self {
            WidgetKind::KpiCard => "kpiCard",
            WidgetKind::BarChart => "barChart",
            WidgetKind::LineChart => "lineChart",
            WidgetKind::PieChart => "pieChart",
        }
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WidgetKind {
    type Err = ParseWidgetKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseWidgetKindError(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: WidgetKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Widget {
    /// Create a widget of `kind` with a freshly allocated id.
    pub fn new(kind: WidgetKind, title: Option<String>) -> Self {
        Self {
            id: format!("w_{}_{}", kind, uuid::Uuid::new_v4()),
            kind,
            title,
            config: None,
        }
    }

    /// Title shown in the widget header: explicit title, else the kind's label.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(self.kind.label())
    }
}
