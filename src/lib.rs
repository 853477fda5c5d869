//! Switchplate renders parameterized documents, such as CloudFormation
//! templates, from a template with `{% switch %}` blocks and `{{ name }}`
//! placeholders, and validates the result before handing it back.
//!
//! Rendering is a single pass through four stages: [`load`], [`resolve`],
//! [`render`] and [`validate`]. [`render_document`] runs the last three over a
//! loaded template, and [`SwitchplateEngine`] keeps named templates around.

mod ast;
mod engine;
mod error;
mod interface;
mod parser;
mod resolve;
mod substitute;
mod template;
mod validate;

// Public exports.
pub use engine::{Rendered, SwitchplateEngine, render_document};
pub use error::{
    Location, ParseError, ParseErrorKind, Stage, SwitchplateError, SwitchplateResult,
    ValidationCategory, ValidationError,
};
pub use interface::{
    Flag, RenderContext, Requirement, SwitchplateInterface, Table, TableEntry, Value, ValueTy,
};
pub use resolve::{ReducedTemplate, Segment, resolve};
pub use substitute::render;
pub use template::{ParameterSchema, Template, load};
pub use validate::{DocumentFormat, Json, validate};
