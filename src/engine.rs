use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{SwitchplateError, SwitchplateResult};
use crate::interface::{RenderContext, Requirement, SwitchplateInterface};
use crate::resolve::resolve;
use crate::substitute::render;
use crate::template::Template;
use crate::validate::{DocumentFormat, Json};

/// The output of a successful render: the rendered text and the document it
/// parsed to.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered<D> {
    pub text: String,
    /// The parsed form of `text`. For JSON, duplicate object keys collapse to
    /// the last one, so `text` is the authoritative output.
    pub document: D,
}

/// Runs the resolve, substitute and validate stages over a loaded template.
///
/// The stages run strictly in order and the first failure is returned as-is;
/// no partial output is produced.
///
/// # Errors
///
/// * `SwitchplateError::UnboundSwitch` - from resolving switches
/// * `SwitchplateError::UnboundPlaceholder` - from substitution
/// * `SwitchplateError::Validation` - if the rendered text is not a valid document
pub fn render_document<F: DocumentFormat + ?Sized>(
    template: &Template<'_>,
    context: &RenderContext<'_>,
    format: &F,
) -> SwitchplateResult<Rendered<F::Document>> {
    let _span = tracing::debug_span!(
        "render",
        template = template.name().unwrap_or("<anonymous>"),
        format = format.name()
    )
    .entered();

    let reduced = resolve(template, context).inspect_err(log_failure)?;
    let text = render(&reduced, context, format).inspect_err(log_failure)?;
    let document = format
        .validate(&text)
        .map_err(SwitchplateError::from)
        .inspect_err(log_failure)?;

    tracing::debug!(bytes = text.len(), "rendered document");
    Ok(Rendered { text, document })
}

fn log_failure(error: &SwitchplateError) {
    tracing::debug!(stage = ?error.stage(), %error, "render failed");
}

/// `SwitchplateEngine` is the primary implementation of the
/// `SwitchplateInterface` trait.
///
/// It keeps a collection of named templates which can be added, rendered,
/// and analyzed for the bindings they still need. Templates can only be
/// added, never replaced, and the engine may be shared between threads.
///
/// # Examples
///
/// ```
/// use switchplate::{RenderContext, SwitchplateEngine, SwitchplateInterface, Value};
///
/// let engine = SwitchplateEngine::new();
/// engine
///     .add_template(
///         "stack",
///         r#"{"Replicas": {% switch ha %}{% case "true" %}3{% case "false" %}1{% endswitch %}}"#,
///     )
///     .unwrap();
///
/// let mut context = RenderContext::new();
/// context.set_flag("ha", true);
///
/// let rendered = engine.render("stack", &context).unwrap();
/// assert_eq!(rendered.text, r#"{"Replicas": 3}"#);
/// assert_eq!(rendered.document["Replicas"], 3);
/// ```
pub struct SwitchplateEngine<F: DocumentFormat = Json> {
    templates: RwLock<HashMap<String, Arc<Template<'static>>>>,
    format: F,
}

impl SwitchplateEngine<Json> {
    /// Creates a new empty engine producing JSON documents.
    pub fn new() -> Self {
        Self::with_format(Json)
    }
}

impl Default for SwitchplateEngine<Json> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: DocumentFormat> SwitchplateEngine<F> {
    /// Creates a new empty engine for documents of `format`.
    pub fn with_format(format: F) -> Self {
        Self {
            templates: RwLock::new(HashMap::new()),
            format,
        }
    }

    pub fn format(&self) -> &F {
        &self.format
    }

    /// Looks up a template by name.
    pub fn template<N: AsRef<str>>(&self, name: N) -> Option<Arc<Template<'static>>> {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name.as_ref())
            .cloned()
    }

    fn require_template(&self, name: &str) -> SwitchplateResult<Arc<Template<'static>>> {
        self.template(name)
            .ok_or_else(|| SwitchplateError::MissingTemplate {
                template_name: name.to_string(),
            })
    }
}

impl<F: DocumentFormat> SwitchplateInterface for SwitchplateEngine<F> {
    type Document = F::Document;

    /// Adds a new template to the engine with the given name and content.
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the template was successfully added
    /// * `Err(SwitchplateError::TemplateExists)` if a template with the given name already exists
    /// * `Err(SwitchplateError::Parse)` if the template content contains syntax errors
    fn add_template<N: AsRef<str>, C: AsRef<str>>(
        &self,
        name: N,
        content: C,
    ) -> SwitchplateResult<()> {
        let name = name.as_ref();
        let exists = || SwitchplateError::TemplateExists {
            template_name: name.to_string(),
        };

        if self.template(name).is_some() {
            return Err(exists());
        }

        let template = Template::load(content.as_ref())?
            .into_owned()
            .with_name(name);

        let mut templates = self
            .templates
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        // Another thread may have added the same name while we were parsing.
        if templates.contains_key(name) {
            return Err(exists());
        }
        templates.insert(name.to_string(), Arc::new(template));
        tracing::debug!(template = name, "registered template");

        Ok(())
    }

    /// Renders the template with the given name using the provided context.
    ///
    /// # Returns
    ///
    /// * `Ok(Rendered)` containing the rendered text and parsed document
    /// * `Err(SwitchplateError::MissingTemplate)` if no template with the given name exists
    /// * Other errors from the pipeline (unbound switches or placeholders, invalid output)
    fn render<N: AsRef<str>>(
        &self,
        template_name: N,
        context: &RenderContext<'_>,
    ) -> SwitchplateResult<Rendered<F::Document>> {
        let template = self.require_template(template_name.as_ref())?;
        render_document(&template, context, &self.format)
    }

    fn requirements<N: AsRef<str>>(
        &self,
        template_name: N,
        context: &RenderContext<'_>,
    ) -> SwitchplateResult<Vec<(String, Requirement)>> {
        let template = self.require_template(template_name.as_ref())?;
        Ok(template.requirements(context))
    }
}
