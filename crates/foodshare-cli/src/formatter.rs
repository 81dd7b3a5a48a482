//! Output formatters for command results.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use foodshare_core::{Claim, IngestReport, ResultTable, Value};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter {
    /// Format a result table.
    fn format_table(&self, table: &ResultTable) -> String;

    /// Format a claim produced by a write.
    fn format_claim(&self, action: &str, claim: &Claim) -> String;

    /// Format an ingestion report.
    fn format_report(&self, report: &IngestReport) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
    }
}

/// A claim as a one-row table.
pub fn claim_table(claim: &Claim) -> ResultTable {
    let integer = |i: Option<i64>| i.map(Value::Integer).unwrap_or(Value::Null);
    ResultTable::new(
        ["Claim_ID", "Food_ID", "Receiver_ID", "Status", "Timestamp"]
            .map(String::from)
            .to_vec(),
        vec![vec![
            Value::Integer(claim.claim_id),
            integer(claim.food_id),
            integer(claim.receiver_id),
            claim
                .status
                .map(|s| Value::Text(s.to_string()))
                .unwrap_or(Value::Null),
            claim
                .timestamp
                .map(|t| Value::Text(t.to_string()))
                .unwrap_or(Value::Null),
        ]],
    )
}

/// Row count verification as a table.
fn row_count_table(report: &IngestReport) -> ResultTable {
    ResultTable::new(
        ["Table", "Source_Rows", "Stored_Rows", "Matches"]
            .map(String::from)
            .to_vec(),
        report
            .row_counts
            .iter()
            .map(|c| {
                vec![
                    Value::Text(c.table.to_string()),
                    Value::Integer(c.source_rows as i64),
                    Value::Integer(c.stored_rows as i64),
                    Value::Text(if c.matches() { "yes" } else { "no" }.into()),
                ]
            })
            .collect(),
    )
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_table(&self, table: &ResultTable) -> String {
        if table.is_empty() {
            return "No results".to_string();
        }
        format!("{}\n{} row(s)", render_table(table), table.len())
    }

    fn format_claim(&self, action: &str, claim: &Claim) -> String {
        format!(
            "Claim {} {}\n{}",
            claim.claim_id,
            action,
            render_table(&claim_table(claim))
        )
    }

    fn format_report(&self, report: &IngestReport) -> String {
        let mut sources = Table::new();
        sources.set_header(vec![
            "Table",
            "Rows",
            "Missing values",
            "Duplicate rows",
            "Contacts normalized",
        ]);
        for s in &report.sources {
            let missing = if s.missing_values.is_empty() {
                "none".to_string()
            } else {
                s.missing_values
                    .iter()
                    .map(|(column, count)| format!("{column}: {count}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            sources.add_row(vec![
                Cell::new(s.table),
                Cell::new(s.rows),
                Cell::new(missing),
                Cell::new(s.duplicate_rows),
                Cell::new(s.contacts_normalized),
            ]);
        }

        let mut output = format!("Sources\n{sources}\n");

        if report.integrity.is_empty() {
            output.push_str("\nReferential integrity: ok\n");
        } else {
            output.push_str("\nReferential integrity violations\n");
            for violation in &report.integrity {
                output.push_str(&format!("  {violation}\n"));
            }
        }

        output.push_str(&format!(
            "\nRow counts\n{}\n{} row(s) loaded",
            render_table(&row_count_table(report)),
            report.rows_loaded()
        ));
        output
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_table(&self, table: &ResultTable) -> String {
        serde_json::to_string_pretty(&table.to_json()).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_claim(&self, action: &str, claim: &Claim) -> String {
        serde_json::json!({
            "action": action,
            "claim": claim,
        })
        .to_string()
    }

    fn format_report(&self, report: &IngestReport) -> String {
        serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
    }
}

/// CSV formatter.
pub struct CsvFormatter;

impl Formatter for CsvFormatter {
    fn format_table(&self, table: &ResultTable) -> String {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let mut write = || -> Result<Vec<u8>, Box<dyn std::error::Error>> {
            writer.write_record(&table.columns)?;
            for row in &table.rows {
                writer.write_record(row.iter().map(format_value_csv))?;
            }
            writer.flush()?;
            Ok(writer.get_ref().clone())
        };

        match write() {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => format!("error\n{e}\n"),
        }
    }

    fn format_claim(&self, _action: &str, claim: &Claim) -> String {
        self.format_table(&claim_table(claim))
    }

    fn format_report(&self, report: &IngestReport) -> String {
        self.format_table(&row_count_table(report))
    }
}

fn render_table(result: &ResultTable) -> Table {
    let mut table = Table::new();
    table.set_header(result.columns.iter().map(Cell::new));
    for row in &result.rows {
        table.add_row(row.iter().map(|value| Cell::new(value.to_string())));
    }
    table
}

/// Format a Value for CSV output. NULL becomes an empty field.
fn format_value_csv(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}
