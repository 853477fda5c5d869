use crate::ast::{AstNode, Case};
use crate::error::{Location, SwitchplateError, SwitchplateResult};
use crate::interface::RenderContext;
use crate::template::Template;

/// A piece of a template after its switches have been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'t> {
    Literal(&'t str),
    Placeholder { name: &'t str, location: Location },
}

/// A template with every switch replaced by its selected case: a flat
/// sequence of literal text and placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReducedTemplate<'t> {
    segments: Vec<Segment<'t>>,
}

impl<'t> ReducedTemplate<'t> {
    pub fn segments(&self) -> &[Segment<'t>] {
        &self.segments
    }

    /// Names of the placeholders left to substitute, in document order.
    pub fn placeholders(&self) -> impl Iterator<Item = &'t str> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder { name, .. } => Some(*name),
            Segment::Literal(_) => None,
        })
    }
}

/// Resolves every `{% switch %}` in `template` against the flags in `context`.
///
/// Switches are resolved outermost first. The bodies of cases that are not
/// selected are never visited, so switches nested inside them need no flag.
///
/// # Errors
///
/// Returns `SwitchplateError::UnboundSwitch` when a reachable switch has no
/// flag. A flag that matches no label falls back to an empty case, and when
/// there is none the switch produces no output.
pub fn resolve<'t>(
    template: &'t Template<'_>,
    context: &RenderContext<'_>,
) -> SwitchplateResult<ReducedTemplate<'t>> {
    let mut reduced = ReducedTemplate::default();
    resolve_nodes(&template.nodes, context, &mut reduced.segments)?;
    Ok(reduced)
}

fn resolve_nodes<'t>(
    nodes: &'t [AstNode<'_>],
    context: &RenderContext<'_>,
    segments: &mut Vec<Segment<'t>>,
) -> SwitchplateResult<()> {
    for node in nodes {
        match node {
            AstNode::Constant { data } => segments.push(Segment::Literal(data)),
            AstNode::Placeholder { name, location } => segments.push(Segment::Placeholder {
                name,
                location: *location,
            }),
            AstNode::Switch {
                name,
                location,
                cases,
            } => {
                let flag = context
                    .flag(name)
                    .ok_or_else(|| SwitchplateError::UnboundSwitch {
                        switch: name.to_string(),
                        location: *location,
                    })?;

                match select_case(cases, flag.as_str()) {
                    Some(case) => {
                        tracing::trace!(switch = %name, case = %case.label, "selected case");
                        resolve_nodes(&case.body, context, segments)?;
                    }
                    None => {
                        tracing::debug!(switch = %name, flag = flag.as_str(), "no case selected");
                    }
                }
            }
        }
    }
    Ok(())
}

/// Picks the case whose label equals `flag`, falling back to an empty case.
pub(crate) fn select_case<'c, 'a>(cases: &'c [Case<'a>], flag: &str) -> Option<&'c Case<'a>> {
    cases
        .iter()
        .find(|case| case.label == flag)
        .or_else(|| cases.iter().find(|case| case.is_optional()))
}
