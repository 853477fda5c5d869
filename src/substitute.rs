use crate::error::{SwitchplateError, SwitchplateResult};
use crate::interface::{RenderContext, Value};
use crate::resolve::{ReducedTemplate, Segment};
use crate::validate::DocumentFormat;

/// Replaces every placeholder in `reduced` with the text of its bound value.
///
/// Literal text passes through untouched. Strings and fragments are inserted
/// verbatim, numbers as unquoted literals and tables as object literals of
/// `format`.
///
/// # Errors
///
/// Returns `SwitchplateError::UnboundPlaceholder` for the first placeholder
/// without a value in `context`.
pub fn render<F: DocumentFormat + ?Sized>(
    reduced: &ReducedTemplate<'_>,
    context: &RenderContext<'_>,
    format: &F,
) -> SwitchplateResult<String> {
    let mut output = String::new();
    for segment in reduced.segments() {
        match segment {
            Segment::Literal(text) => output.push_str(text),
            Segment::Placeholder { name, location } => {
                let value =
                    context
                        .get(name)
                        .ok_or_else(|| SwitchplateError::UnboundPlaceholder {
                            name: name.to_string(),
                            location: *location,
                        })?;
                write_value(value, format, &mut output);
            }
        }
    }
    Ok(output)
}

fn write_value<F: DocumentFormat + ?Sized>(value: &Value<'_>, format: &F, output: &mut String) {
    match value {
        Value::String(data) | Value::Fragment(data) => output.push_str(data),
        Value::Number(number) => output.push_str(&number.to_string()),
        Value::Table(table) => format.write_table(table, output),
    }
}
