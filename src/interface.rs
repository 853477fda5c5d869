use std::{borrow::Cow, collections::BTreeMap};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueTy {
    String,
    Number,
    Fragment,
    Table,
}

/// A value bound to a `{{ placeholder }}`.
///
/// The variant decides how the value is written into the document; nothing is
/// inferred from the content of the value itself.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value<'a> {
    /// Inserted verbatim. Escaping for the target format is the caller's job.
    String(Cow<'a, str>),
    /// Inserted as an unquoted numeric literal.
    Number(serde_json::Number),
    /// A pre-rendered piece of the target document, inserted verbatim.
    Fragment(Cow<'a, str>),
    /// Inserted as an object literal of the target format.
    Table(Table),
}

impl<'a> Value<'a> {
    pub fn string<T: Into<Cow<'a, str>>>(data: T) -> Self {
        Self::String(data.into())
    }

    pub fn number<T: Into<serde_json::Number>>(number: T) -> Self {
        Self::Number(number.into())
    }

    pub fn fragment<T: Into<Cow<'a, str>>>(data: T) -> Self {
        Self::Fragment(data.into())
    }

    pub const fn ty(&self) -> ValueTy {
        match self {
            Self::String(_) => ValueTy::String,
            Self::Number(_) => ValueTy::Number,
            Self::Fragment(_) => ValueTy::Fragment,
            Self::Table(_) => ValueTy::Table,
        }
    }

    pub fn into_owned(self) -> Value<'static> {
        match self {
            Self::String(data) => Value::String(Cow::Owned(data.into_owned())),
            Self::Number(number) => Value::Number(number),
            Self::Fragment(data) => Value::Fragment(Cow::Owned(data.into_owned())),
            Self::Table(table) => Value::Table(table),
        }
    }
}

impl From<Table> for Value<'_> {
    fn from(table: Table) -> Self {
        Self::Table(table)
    }
}

/// A single entry in a [`Table`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableEntry {
    String(String),
    Number(serde_json::Number),
    Table(Table),
}

impl From<&str> for TableEntry {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for TableEntry {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<serde_json::Number> for TableEntry {
    fn from(value: serde_json::Number) -> Self {
        Self::Number(value)
    }
}

impl From<Table> for TableEntry {
    fn from(value: Table) -> Self {
        Self::Table(value)
    }
}

/// An ordered mapping table.
///
/// Entries keep the order they were inserted in, and duplicate keys are kept
/// as-is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    entries: Vec<(String, TableEntry)>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K: Into<String>, V: Into<TableEntry>>(&mut self, key: K, value: V) -> &mut Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    pub fn entries(&self) -> &[(String, TableEntry)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<TableEntry>> FromIterator<(K, V)> for Table {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Table {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Table {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct TableVisitor;

        impl<'de> serde::de::Visitor<'de> for TableVisitor {
            type Value = Table;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map of table entries")
            }

            // Visiting the map directly keeps source order and duplicate keys.
            fn visit_map<A>(self, mut access: A) -> Result<Table, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                let mut table = Table::new();
                while let Some((key, value)) = access.next_entry::<String, TableEntry>()? {
                    table.entries.push((key, value));
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

/// The value a `{% switch %}` is compared against its case labels with.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "FlagRepr", into = "String"))]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Flag<'a>(Cow<'a, str>);

impl Flag<'_> {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_owned(self) -> Flag<'static> {
        Flag(Cow::Owned(self.0.into_owned()))
    }
}

impl From<bool> for Flag<'_> {
    fn from(value: bool) -> Self {
        Self(Cow::Borrowed(if value { "true" } else { "false" }))
    }
}

impl<'a> From<&'a str> for Flag<'a> {
    fn from(value: &'a str) -> Self {
        Self(Cow::Borrowed(value))
    }
}

impl From<String> for Flag<'_> {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

impl From<Flag<'_>> for String {
    fn from(value: Flag<'_>) -> Self {
        value.0.into_owned()
    }
}

/// Flags may be written as labels or as JSON booleans.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum FlagRepr {
    Bool(bool),
    Label(String),
}

#[cfg(feature = "serde")]
impl From<FlagRepr> for Flag<'_> {
    fn from(value: FlagRepr) -> Self {
        match value {
            FlagRepr::Bool(value) => value.into(),
            FlagRepr::Label(value) => value.into(),
        }
    }
}

/// The bindings for a single render pass: flags for switches, values for
/// placeholders.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderContext<'a> {
    flags: BTreeMap<String, Flag<'a>>,
    values: BTreeMap<String, Value<'a>>,
}

impl RenderContext<'_> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<'a> RenderContext<'a> {
    pub fn set_flag<N: AsRef<str>, F: Into<Flag<'a>>>(&mut self, name: N, flag: F) -> &mut Self {
        self.flags.insert(name.as_ref().to_string(), flag.into());
        self
    }

    pub fn insert<N: AsRef<str>, V: Into<Value<'a>>>(&mut self, name: N, value: V) -> &mut Self {
        self.values.insert(name.as_ref().to_string(), value.into());
        self
    }

    pub fn flag<N: AsRef<str>>(&self, name: N) -> Option<&Flag<'a>> {
        self.flags.get(name.as_ref())
    }

    pub fn get<N: AsRef<str>>(&self, name: N) -> Option<&Value<'a>> {
        self.values.get(name.as_ref())
    }

    pub fn contains_flag<N: AsRef<str>>(&self, name: N) -> bool {
        self.flags.contains_key(name.as_ref())
    }

    pub fn contains<N: AsRef<str>>(&self, name: N) -> bool {
        self.values.contains_key(name.as_ref())
    }
}

/// What kind of binding a template still requires.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Requirement {
    /// A switch needs a flag.
    Flag,
    /// A placeholder needs a value.
    Value,
}

/// `SwitchplateInterface` is the trait for the Switchplate engine: a named
/// store of templates that renders them to validated documents.
pub trait SwitchplateInterface {
    /// The parsed document produced by a successful render.
    type Document;

    /// `add_template` tries to make a new template available in the engine.
    ///
    /// # Errors
    /// - If the template name is a duplicate.
    /// - If the template fails to parse.
    fn add_template<N: AsRef<str>, C: AsRef<str>>(
        &self,
        name: N,
        content: C,
    ) -> crate::SwitchplateResult<()>;

    /// `render` runs the full pipeline for a template with the given context.
    ///
    /// # Errors
    /// - If the template name is not found.
    /// - If a reachable switch or placeholder is unbound.
    /// - If the rendered text is not a valid document.
    fn render<N: AsRef<str>>(
        &self,
        template_name: N,
        context: &RenderContext<'_>,
    ) -> crate::SwitchplateResult<crate::Rendered<Self::Document>>;

    /// `requirements` lists the bindings still missing to render the selected
    /// template with `context`.
    ///
    /// Branches eliminated by flags already in `context` are skipped.
    ///
    /// # Errors
    /// - If the template name is not found.
    fn requirements<N: AsRef<str>>(
        &self,
        template_name: N,
        context: &RenderContext<'_>,
    ) -> crate::SwitchplateResult<Vec<(String, Requirement)>>;
}
