//! CSV export of table records.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::TableError;

const BOM: char = '\u{FEFF}';
const YES: &str = "نعم";
const NO: &str = "لا";

/// A CSV column: record field and header label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvColumn {
    pub key: String,
    pub label: String,
}

impl CsvColumn {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

/// Render `records` as CSV prefixed with a UTF-8 BOM.
///
/// Without explicit `columns` every field of the first record becomes a
/// column, labelled with its own name. An empty slice renders nothing.
pub fn to_csv<T: Serialize>(
    records: &[T],
    columns: Option<&[CsvColumn]>,
) -> Result<String, TableError> {
    if records.is_empty() {
        warn!(target: "sijil::table", "no records to export");
        return Ok(String::new());
    }

    let rows = records
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;

    let columns = match columns {
        Some(columns) => columns.to_vec(),
        None => match &rows[0] {
            Value::Object(fields) => fields
                .keys()
                .map(|key| CsvColumn::new(key.clone(), key.clone()))
                .collect(),
            _ => Vec::new(),
        },
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        columns
            .iter()
            .map(|column| escape(&column.label))
            .collect::<Vec<_>>()
            .join(","),
    );
    for row in &rows {
        lines.push(
            columns
                .iter()
                .map(|column| escape(&format_value(row.get(&column.key))))
                .collect::<Vec<_>>()
                .join(","),
        );
    }

    let mut csv = String::new();
    csv.push(BOM);
    csv.push_str(&lines.join("\n"));
    Ok(csv)
}

fn format_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::Bool(true)) => YES.to_string(),
        Some(Value::Bool(false)) => NO.to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn escape(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
