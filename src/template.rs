use std::collections::{BTreeMap, BTreeSet};

use crate::ast::AstNode;
use crate::error::SwitchplateResult;
use crate::interface::{RenderContext, Requirement};
use crate::parser::tokenize;
use crate::resolve::select_case;

/// Parses `source` into a [`Template`].
///
/// # Errors
///
/// Returns a `SwitchplateError::Parse` error if the template syntax is invalid.
pub fn load(source: &str) -> SwitchplateResult<Template<'_>> {
    Template::load(source)
}

/// A Template represents a parsed template that can be rendered with a context.
///
/// Templates are created by parsing a string of template content into a
/// sequence of literal text, `{{ placeholder }}` and `{% switch %}` nodes.
/// A loaded template is immutable and may be rendered any number of times,
/// from any number of threads.
///
/// # Example
///
/// ```rust
/// use switchplate::{Json, RenderContext, Template, Value, render_document};
///
/// let template = Template::load(r#"{"Count": {{ n }}}"#).unwrap();
///
/// let mut context = RenderContext::new();
/// context.insert("n", Value::number(3));
///
/// let rendered = render_document(&template, &context, &Json).unwrap();
/// assert_eq!(rendered.text, r#"{"Count": 3}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template<'a> {
    pub(crate) nodes: Vec<AstNode<'a>>,
    pub(crate) name: Option<String>,
}

/// Every switch and placeholder a template references, reachable or not.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParameterSchema {
    /// Switch names with the case labels they are compared against.
    pub switches: BTreeMap<String, BTreeSet<String>>,
    pub placeholders: BTreeSet<String>,
}

impl<'a> Template<'a> {
    /// Creates a new template by parsing the provided content string.
    ///
    /// The template borrows from `content`; use [`Template::into_owned`] to
    /// detach it.
    ///
    /// # Errors
    ///
    /// Returns a `SwitchplateError::Parse` error if the template syntax is invalid.
    pub fn load(content: &'a str) -> SwitchplateResult<Self> {
        let nodes = tokenize(content)?;
        tracing::debug!(
            bytes = content.len(),
            nodes = nodes.len(),
            "loaded template"
        );
        Ok(Self { nodes, name: None })
    }

    /// Detaches the template from the source it was parsed from.
    pub fn into_owned(self) -> Template<'static> {
        Template {
            nodes: self.nodes.into_iter().map(AstNode::into_owned).collect(),
            name: self.name,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn with_name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The declared parameter schema: every switch (with its labels) and
    /// every placeholder in the template, including those in nested cases.
    pub fn schema(&self) -> ParameterSchema {
        let mut schema = ParameterSchema::default();
        collect_schema(&self.nodes, &mut schema);
        schema
    }

    /// Collects the bindings required to render this template that are not
    /// already in `context`.
    ///
    /// Cases not selected by a flag already present in `context` are skipped,
    /// so their switches and placeholders are never required. When a switch is
    /// unbound all of its cases are considered reachable. The result is sorted
    /// by name and free of duplicates.
    ///
    /// # Example
    ///
    /// ```
    /// use switchplate::{RenderContext, Requirement, Template};
    ///
    /// let template = Template::load(
    ///     r#"{% switch ha %}{% case "true" %}{{ replicas }}{% case "false" %}1{% endswitch %}"#,
    /// )
    /// .unwrap();
    ///
    /// let mut context = RenderContext::new();
    /// assert_eq!(
    ///     template.requirements(&context),
    ///     vec![
    ///         ("ha".to_string(), Requirement::Flag),
    ///         ("replicas".to_string(), Requirement::Value),
    ///     ]
    /// );
    ///
    /// context.set_flag("ha", false);
    /// assert!(template.requirements(&context).is_empty());
    /// ```
    pub fn requirements(&self, context: &RenderContext<'_>) -> Vec<(String, Requirement)> {
        let mut requirements = Vec::new();
        collect_requirements(&self.nodes, context, &mut requirements);
        requirements.sort();
        requirements.dedup();
        requirements
    }
}

fn collect_schema(nodes: &[AstNode<'_>], schema: &mut ParameterSchema) {
    for node in nodes {
        match node {
            AstNode::Constant { .. } => {}
            AstNode::Placeholder { name, .. } => {
                schema.placeholders.insert(name.to_string());
            }
            AstNode::Switch { name, cases, .. } => {
                let labels = schema.switches.entry(name.to_string()).or_default();
                labels.extend(cases.iter().map(|case| case.label.to_string()));
                for case in cases {
                    collect_schema(&case.body, schema);
                }
            }
        }
    }
}

fn collect_requirements(
    nodes: &[AstNode<'_>],
    context: &RenderContext<'_>,
    requirements: &mut Vec<(String, Requirement)>,
) {
    for node in nodes {
        match node {
            AstNode::Constant { .. } => {}
            AstNode::Placeholder { name, .. } => {
                if !context.contains(name) {
                    requirements.push((name.to_string(), Requirement::Value));
                }
            }
            AstNode::Switch { name, cases, .. } => match context.flag(name) {
                Some(flag) => {
                    // A flag matching no case and no empty case selects nothing.
                    if let Some(case) = select_case(cases, flag.as_str()) {
                        collect_requirements(&case.body, context, requirements);
                    }
                }
                None => {
                    requirements.push((name.to_string(), Requirement::Flag));
                    for case in cases {
                        collect_requirements(&case.body, context, requirements);
                    }
                }
            },
        }
    }
}
