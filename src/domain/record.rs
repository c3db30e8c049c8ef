// Record domain model - column descriptors discovered from table schemas
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a column's values are rendered and cast from form input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnFormat {
    Date,
    Currency,
    Number,
    Text,
    Boolean,
}

impl ColumnFormat {
    /// Map a Postgres `data_type` onto a display format.
    pub fn from_sql_type(data_type: &str) -> Self {
        match data_type {
            "timestamp without time zone" | "timestamp with time zone" | "date" => ColumnFormat::Date,
            "numeric" | "decimal" => ColumnFormat::Currency,
            "double precision" | "real" | "bigint" | "integer" | "smallint" => ColumnFormat::Number,
            "boolean" => ColumnFormat::Boolean,
            _ => ColumnFormat::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub key: String,
    pub label: String,
    pub format: ColumnFormat,
    pub required: bool,
    pub sortable: bool,
}

/// Raw column row as returned by the schema introspection RPC.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnInfo {
    pub column_name: String,
    pub data_type: String,
    #[serde(default)]
    pub is_nullable: bool,
}

const HIDDEN_COLUMNS: [&str; 5] = ["id", "password", "created_at", "updated_at", "user_id"];

impl ColumnDescriptor {
    /// Build an editable column from introspection output.
    ///
    /// Returns `None` for bookkeeping and private columns that are never shown.
    pub fn from_info(info: &ColumnInfo) -> Option<Self> {
        let name = info.column_name.as_str();
        if HIDDEN_COLUMNS.contains(&name) || name.starts_with("private_") {
            return None;
        }

        Some(Self {
            key: name.to_string(),
            label: humanize(name),
            format: ColumnFormat::from_sql_type(&info.data_type),
            required: !info.is_nullable,
            sortable: true,
        })
    }
}

/// `unit_price` -> `Unit Price`
pub fn humanize(column: &str) -> String {
    column
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cast a raw form value to the JSON the database expects for `format`.
pub fn cast_form_value(raw: &str, format: ColumnFormat) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }

    match format {
        ColumnFormat::Currency | ColumnFormat::Number => trimmed
            .replacen(',', ".", 1)
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ColumnFormat::Date => parse_date(trimmed)
            .map(|date| Value::String(date.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null),
        ColumnFormat::Boolean => {
            Value::Bool(trimmed.eq_ignore_ascii_case("true") || trimmed == "1" || trimmed == "yes")
        }
        ColumnFormat::Text => Value::String(trimmed.to_string()),
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(value, "%Y-%m-%d").ok())
}

/// One page of rows plus the total row count reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowPage {
    pub rows: Vec<Value>,
    pub total_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Bucket size for date aggregations feeding chart widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Monthly,
    Quarterly,
    Yearly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSum {
    pub period: String,
    pub total_sum: f64,
}

/// Table and column names end up in URLs, keep them to plain identifiers.
pub fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
