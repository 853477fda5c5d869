use thiserror::Error;

pub type SwitchplateResult<T> = std::result::Result<T, SwitchplateError>;

/// A position in a template source or a rendered document.
///
/// `line` and `column` are 1-indexed, `offset` is the 0-indexed byte offset.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Location {
    /// Derives the location of byte `offset` in `text`.
    pub fn at_offset(text: &str, offset: usize) -> Self {
        let offset = offset.min(text.len());
        let before = text.as_bytes().get(..offset).unwrap_or_default();
        let line = before
            .iter()
            .filter(|b| **b == b'\n')
            .count()
            .saturating_add(1);
        let line_start = before
            .iter()
            .rposition(|b| *b == b'\n')
            .map_or(0, |pos| pos.saturating_add(1));
        Self {
            line,
            column: offset.saturating_sub(line_start).saturating_add(1),
            offset,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}, column {} (byte {})",
            self.line, self.column, self.offset
        )
    }
}

/// The pipeline stage an error was raised in.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Load,
    Resolve,
    Substitute,
    Validate,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Load => "load",
            Self::Resolve => "resolve",
            Self::Substitute => "substitute",
            Self::Validate => "validate",
        };
        f.write_str(name)
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum ParseErrorKind {
    #[error("Unexpected EOF{expected_what}")]
    UnexpectedEOF {
        /// Describes what was expected, e.g., " (expected '{% endswitch %}')"
        expected_what: String,
    },
    #[error("Expected {description}")]
    Expected { description: String },
    #[error("Unknown directive '{keyword}'")]
    UnknownKeyword { keyword: String },
    #[error("'{{% {keyword} %}}' outside of a switch block")]
    OutsideSwitch { keyword: String },
    #[error("Duplicate case \"{label}\" in switch '{switch}'")]
    DuplicateCase { switch: String, label: String },
    #[error("Switch '{switch}' has no cases")]
    EmptySwitch { switch: String },
}

impl ParseErrorKind {
    pub fn unexpected_eof(expected: Option<&str>) -> Self {
        Self::UnexpectedEOF {
            expected_what: expected.map_or_else(String::new, |e| format!(" (expected '{}')", e)),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[error("Parse error at {location}: {kind}")]
pub struct ParseError {
    pub location: Location,
    #[source]
    pub kind: ParseErrorKind,
}

/// Broad class of a validation failure, mirroring the JSON parser's own categories.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ValidationCategory {
    /// The text is not syntactically valid.
    Syntax,
    /// The text ended before the document was complete.
    Eof,
    /// The text is well formed but semantically invalid for the format.
    Data,
}

/// The rendered text failed to parse as the target document format.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[error("Rendered document is invalid at {location}: {message}")]
pub struct ValidationError {
    pub location: Location,
    pub category: ValidationCategory,
    pub message: String,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum SwitchplateError {
    #[error("Template already exists: {template_name}")]
    TemplateExists { template_name: String },
    #[error("Template not found: {template_name}")]
    MissingTemplate { template_name: String },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("No flag bound for switch '{switch}' at {location}")]
    UnboundSwitch { switch: String, location: Location },
    #[error("No value bound for placeholder '{name}' at {location}")]
    UnboundPlaceholder { name: String, location: Location },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl SwitchplateError {
    /// The pipeline stage that produced this error, if any.
    ///
    /// Registry lookups happen before the pipeline starts and report `None`.
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::Parse(_) => Some(Stage::Load),
            Self::UnboundSwitch { .. } => Some(Stage::Resolve),
            Self::UnboundPlaceholder { .. } => Some(Stage::Substitute),
            Self::Validation(_) => Some(Stage::Validate),
            Self::TemplateExists { .. } | Self::MissingTemplate { .. } => None,
        }
    }

    /// Where in the template (or rendered document, for validation errors) the error occurred.
    pub const fn location(&self) -> Option<Location> {
        match self {
            Self::Parse(error) => Some(error.location),
            Self::UnboundSwitch { location, .. } | Self::UnboundPlaceholder { location, .. } => Some(*location),
            Self::Validation(error) => Some(error.location),
            Self::TemplateExists { .. } | Self::MissingTemplate { .. } => None,
        }
    }
}
