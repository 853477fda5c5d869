use serde_json::error::Category;

use crate::error::{Location, ValidationCategory, ValidationError};
use crate::interface::{Table, TableEntry};

/// The structured format a template renders to.
///
/// A format knows how to write a [`Table`] as one of its own object
/// literals, and how to check that a rendered document is well formed.
pub trait DocumentFormat {
    /// The parsed form of a valid document.
    type Document;

    /// Short name used in logs, e.g. `"json"`.
    fn name(&self) -> &'static str;

    /// Appends `table` to `output` as an object literal, keeping entry order,
    /// duplicate keys and entry types exactly as given.
    fn write_table(&self, table: &Table, output: &mut String);

    /// Parses `text`, reporting the first error with its location.
    ///
    /// The parsed document may be lossy where the text is not: JSON objects
    /// keep only the last of any duplicate keys, so a [`Table`] with repeated
    /// keys appears in full only in the rendered text.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if `text` is not a complete, well formed
    /// document. The text is never truncated or repaired.
    fn validate(&self, text: &str) -> Result<Self::Document, ValidationError>;
}

/// JSON documents, e.g. CloudFormation templates.
///
/// Parsed documents keep object keys in source order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Json;

impl DocumentFormat for Json {
    type Document = serde_json::Value;

    fn name(&self) -> &'static str {
        "json"
    }

    fn write_table(&self, table: &Table, output: &mut String) {
        output.push('{');
        for (index, (key, entry)) in table.entries().iter().enumerate() {
            if index > 0 {
                output.push_str(", ");
            }
            write_json_string(key, output);
            output.push_str(": ");
            match entry {
                TableEntry::String(value) => write_json_string(value, output),
                TableEntry::Number(number) => output.push_str(&number.to_string()),
                TableEntry::Table(nested) => self.write_table(nested, output),
            }
        }
        output.push('}');
    }

    fn validate(&self, text: &str) -> Result<serde_json::Value, ValidationError> {
        serde_json::from_str(text).map_err(|error| json_validation_error(text, &error))
    }
}

/// Validates `text` as JSON.
///
/// # Errors
///
/// Returns a `ValidationError` carrying the byte offset of the failure.
pub fn validate(text: &str) -> Result<serde_json::Value, ValidationError> {
    Json.validate(text)
}

fn write_json_string(value: &str, output: &mut String) {
    output.push_str(&serde_json::Value::from(value).to_string());
}

fn json_validation_error(text: &str, error: &serde_json::Error) -> ValidationError {
    let category = match error.classify() {
        Category::Eof => ValidationCategory::Eof,
        Category::Data => ValidationCategory::Data,
        Category::Syntax | Category::Io => ValidationCategory::Syntax,
    };

    // serde_json reports 1-indexed line/column pointing at the offending byte.
    let line_start = match error.line() {
        0 | 1 => 0,
        line => text
            .match_indices('\n')
            .nth(line.saturating_sub(2))
            .map_or(text.len(), |(index, _)| index.saturating_add(1)),
    };
    let offset = line_start.saturating_add(error.column()).saturating_sub(1);

    // The location is already carried separately.
    let message = error.to_string();
    let message = message
        .rsplit_once(" at line ")
        .map_or(message.as_str(), |(message, _)| message)
        .to_string();

    ValidationError {
        location: Location::at_offset(text, offset),
        category,
        message,
    }
}
