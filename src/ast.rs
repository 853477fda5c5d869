use std::borrow::Cow;

use crate::error::Location;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AstNode<'a> {
    /// A constant block of text from the template, with all escapes processed.
    ///
    /// If there were no escapes in the given text this will be Borrowed -
    /// otherwise we are forced to allocate.
    Constant { data: Cow<'a, str> },
    /// A `{{ name }}` placeholder.
    Placeholder {
        name: Cow<'a, str>,
        location: Location,
    },
    /// A `{% switch name %}` block with its cases in source order.
    Switch {
        name: Cow<'a, str>,
        location: Location,
        cases: Vec<Case<'a>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Case<'a> {
    pub(crate) label: Cow<'a, str>,
    pub(crate) body: Vec<AstNode<'a>>,
}

impl Case<'_> {
    /// An empty case (nothing but whitespace) is the fallback for unmatched flags.
    pub(crate) fn is_optional(&self) -> bool {
        self.body.iter().all(|node| match node {
            AstNode::Constant { data } => data.trim().is_empty(),
            AstNode::Placeholder { .. } | AstNode::Switch { .. } => false,
        })
    }

    fn into_owned(self) -> Case<'static> {
        Case {
            label: Cow::Owned(self.label.into_owned()),
            body: self.body.into_iter().map(AstNode::into_owned).collect(),
        }
    }
}

impl AstNode<'_> {
    pub(crate) fn into_owned(self) -> AstNode<'static> {
        match self {
            AstNode::Constant { data } => AstNode::Constant {
                data: Cow::Owned(data.into_owned()),
            },
            AstNode::Placeholder { name, location } => AstNode::Placeholder {
                name: Cow::Owned(name.into_owned()),
                location,
            },
            AstNode::Switch {
                name,
                location,
                cases,
            } => AstNode::Switch {
                name: Cow::Owned(name.into_owned()),
                location,
                cases: cases.into_iter().map(Case::into_owned).collect(),
            },
        }
    }
}
