//! Bulk import/export of the category set
//!
//! JSON export is the full round-trippable configuration (categories plus
//! global markup). CSV uses a fixed column order with semicolon-joined
//! patterns and a `Global` sentinel for categories without a custom markup.
//! CSV import is row-tolerant: malformed rows are collected with their row
//! number and reason while the rest of the batch goes through; JSON import
//! is all-or-nothing. The tiny CSV codec below handles quoting only — the
//! format is fixed and flat, so a full CSV dependency would be dead weight.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;
use tracing::{info, warn};

use crate::error::EngineError;
use crate::models::category::{normalize_name, validate_markup, validate_price, clean_patterns};
use crate::models::{Category, NewCategory};
use crate::EngineResult;

use super::persistence::CategoryFile;
use super::{next_priority, CategoryStore};

/// CSV header, fixed column order
const CSV_HEADER: [&str; 11] = [
    "Name",
    "Display Name",
    "Base Price",
    "Custom Markup",
    "Final Price",
    "Currency",
    "Patterns",
    "Description",
    "Active",
    "Created",
    "Updated",
];

/// Sentinel written in the markup column for categories on the global markup
const GLOBAL_MARKUP_SENTINEL: &str = "Global";

/// One skipped row during a CSV import
#[derive(Debug, Clone, Serialize)]
pub struct RowError {
    /// 1-based row number in the input, header included
    pub row: usize,
    pub reason: String,
}

/// Outcome of a row-tolerant bulk import
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub errors: Vec<RowError>,
}

impl CategoryStore {
    /// Export the full category set as round-trippable JSON
    pub fn export_json(&self) -> EngineResult<String> {
        let inner = self.lock()?;
        let file = CategoryFile {
            global_markup_percent: inner.global_markup_percent,
            categories: inner.categories.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Import a JSON category set, merging into or replacing the current one
    ///
    /// All-or-nothing: any invalid category rejects the whole import before
    /// the store changes. Replace mode also adopts the imported global
    /// markup; merge mode keeps the current one and reprices imported
    /// categories under it.
    pub fn import_json(&self, data: &str, merge: bool) -> EngineResult<usize> {
        let file: CategoryFile = serde_json::from_str(data)?;

        // validate everything before touching the store
        let mut incoming = Vec::with_capacity(file.categories.len());
        for (name, mut category) in file.categories {
            category.name = normalize_name(&name);
            if category.name.is_empty() {
                return Err(EngineError::Validation(
                    "category name is required".to_string(),
                ));
            }
            validate_price(category.base_price_per_minute)?;
            if let Some(markup) = category.custom_markup_percent {
                validate_markup(markup)?;
            }
            category.patterns = clean_patterns(&category.patterns)?;
            incoming.push(category);
        }

        let mut inner = self.lock()?;
        let snapshot = inner.clone();
        if !merge {
            inner.categories.clear();
            inner.global_markup_percent = file.global_markup_percent;
        }

        let global_markup = inner.global_markup_percent;
        let count = incoming.len();
        for mut category in incoming {
            category.refresh_pricing(global_markup);
            inner.categories.insert(category.name.clone(), category);
        }

        self.persist_or_rollback(&mut inner, snapshot)?;

        info!(imported = count, merge, "category JSON import completed");
        Ok(count)
    }

    /// Export the category set as CSV with the fixed column order
    pub fn export_csv(&self) -> EngineResult<String> {
        let inner = self.lock()?;

        let mut out = String::new();
        write_row(&mut out, &CSV_HEADER);
        for category in inner.categories.values() {
            let markup = match category.custom_markup_percent {
                Some(percent) => format!("{percent}%"),
                None => GLOBAL_MARKUP_SENTINEL.to_string(),
            };
            let active = if category.is_active { "true" } else { "false" };
            let row = [
                category.name.clone(),
                category.display_name.clone(),
                category.base_price_per_minute.to_string(),
                markup,
                category.price_with_markup.to_string(),
                category.currency.clone(),
                category.patterns.join(";"),
                category.description.clone(),
                active.to_string(),
                category.created_at.to_rfc3339(),
                category.updated_at.to_rfc3339(),
            ];
            write_row(&mut out, &row);
        }
        Ok(out)
    }

    /// Import categories from CSV, skipping malformed rows
    ///
    /// Tolerates a comma decimal separator in numeric columns. Rows that
    /// cannot be parsed or validated are reported in the returned
    /// [`ImportReport`] with their row number; the remaining rows are
    /// imported and persisted.
    pub fn import_csv(&self, data: &str, merge: bool) -> EngineResult<ImportReport> {
        let mut inner = self.lock()?;
        let snapshot = inner.clone();
        if !merge {
            inner.categories.clear();
        }

        let global_markup = inner.global_markup_percent;
        let mut imported = 0;
        let mut errors = Vec::new();

        for (row, fields) in parse_csv(data) {
            if row == 1 && is_header(&fields) {
                continue;
            }

            let priority = next_priority(&inner.categories);
            match parse_row(&fields, global_markup, &self.default_currency, priority) {
                Ok(category) => {
                    inner.categories.insert(category.name.clone(), category);
                    imported += 1;
                }
                Err(reason) => {
                    warn!(row, %reason, "skipping malformed category row");
                    errors.push(RowError { row, reason });
                }
            }
        }

        self.persist_or_rollback(&mut inner, snapshot)?;

        info!(
            imported,
            skipped = errors.len(),
            merge,
            "category CSV import completed"
        );
        Ok(ImportReport { imported, errors })
    }
}

fn is_header(fields: &[String]) -> bool {
    fields
        .first()
        .map(|f| f.trim().eq_ignore_ascii_case("Name"))
        .unwrap_or(false)
}

/// Parse one CSV data row into a category
fn parse_row(
    fields: &[String],
    global_markup: Decimal,
    default_currency: &str,
    priority: i32,
) -> Result<Category, String> {
    if fields.len() < 9 {
        return Err(format!("expected at least 9 columns, got {}", fields.len()));
    }

    let base_price = parse_decimal_lenient(&fields[2])
        .map_err(|e| format!("invalid base price '{}': {e}", fields[2]))?;
    let custom_markup = parse_markup_field(&fields[3])?;
    let currency = match fields[5].trim() {
        "" => None,
        other => Some(other.to_string()),
    };
    let patterns: Vec<String> = fields[6].split(';').map(|p| p.to_string()).collect();
    let is_active = parse_bool_lenient(&fields[8])
        .ok_or_else(|| format!("invalid active flag '{}'", fields[8]))?;

    let draft = NewCategory {
        name: fields[0].clone(),
        display_name: fields[1].clone(),
        base_price_per_minute: base_price,
        patterns,
        currency,
        description: fields[7].clone(),
        custom_markup_percent: custom_markup,
        priority: Some(priority),
    };

    let mut category = Category::new(draft, global_markup, default_currency, priority)
        .map_err(|e| e.to_string())?;
    category.is_active = is_active;
    if let Some(created) = fields.get(9).and_then(|f| parse_timestamp(f)) {
        category.created_at = created;
    }
    if let Some(updated) = fields.get(10).and_then(|f| parse_timestamp(f)) {
        category.updated_at = updated;
    }
    Ok(category)
}

/// Parse the markup column: a percent, or the Global sentinel / blank
fn parse_markup_field(field: &str) -> Result<Option<Decimal>, String> {
    let trimmed = field.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case(GLOBAL_MARKUP_SENTINEL)
        || trimmed.eq_ignore_ascii_case("Globale")
    {
        return Ok(None);
    }

    let without_percent = trimmed.strip_suffix('%').unwrap_or(trimmed);
    parse_decimal_lenient(without_percent)
        .map(Some)
        .map_err(|e| format!("invalid markup '{trimmed}': {e}"))
}

/// Parse a decimal, tolerating a comma as the decimal separator
fn parse_decimal_lenient(field: &str) -> Result<Decimal, rust_decimal::Error> {
    let trimmed = field.trim();
    Decimal::from_str(trimmed).or_else(|_| Decimal::from_str(&trimmed.replace(',', ".")))
}

fn parse_bool_lenient(field: &str) -> Option<bool> {
    match field.trim().to_lowercase().as_str() {
        "true" | "yes" | "si" | "sì" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn parse_timestamp(field: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(field.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ==================== minimal CSV codec ====================

fn write_row<S: AsRef<str>>(out: &mut String, fields: &[S]) {
    for (i, field) in fields.iter().enumerate() {
        let field = field.as_ref();
        if i > 0 {
            out.push(',');
        }
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push('\n');
}

/// Split CSV input into rows of fields, honoring quoting
///
/// Returns each row with the 1-based line number it starts on.
fn parse_csv(data: &str) -> Vec<(usize, Vec<String>)> {
    let mut rows = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1usize;
    let mut row_line = 1usize;

    let mut chars = data.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            '\r' if !in_quotes => {}
            '\n' if !in_quotes => {
                line += 1;
                if !fields.is_empty() || !field.is_empty() {
                    fields.push(std::mem::take(&mut field));
                    rows.push((row_line, std::mem::take(&mut fields)));
                }
                row_line = line;
            }
            '\n' => {
                line += 1;
                field.push('\n');
            }
            _ => field.push(c),
        }
    }
    if !fields.is_empty() || !field.is_empty() {
        fields.push(field);
        rows.push((row_line, fields));
    }
    rows
}
