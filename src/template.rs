//! Structured query templates
//!
//! A [`Template`] keeps the boundary between literal SQL text and the values
//! interpolated into it. [`sanitize`] turns every interpolation into a `?`
//! placeholder and returns the values separately, so they can be bound
//! instead of spliced into the query text.
//!
//! ```
//! use secretdb::{sanitize, template, Value};
//!
//! let name = "Alice' OR 1=1; -- ";
//! let (sql, args) = sanitize(template!("SELECT secret FROM users WHERE name = ", {name})).unwrap();
//! assert_eq!(sql, "SELECT secret FROM users WHERE name = ?");
//! assert_eq!(args, vec![Value::from(name)]);
//! ```

use crate::error::{Error, Result};
use crate::storage::Value;

/// One piece of a template
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    /// SQL text written by the programmer
    Literal(String),
    /// A value supplied at runtime
    Interpolation(Value),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    parts: Vec<TemplatePart>,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn literal(mut self, text: impl Into<String>) -> Self {
        self.push_literal(text);
        self
    }

    pub fn interpolate(mut self, value: impl Into<Value>) -> Self {
        self.push_interpolation(value);
        self
    }

    pub fn push_literal(&mut self, text: impl Into<String>) {
        self.parts.push(TemplatePart::Literal(text.into()));
    }

    pub fn push_interpolation(&mut self, value: impl Into<Value>) {
        self.parts.push(TemplatePart::Interpolation(value.into()));
    }

    pub fn interpolation_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, TemplatePart::Interpolation(_)))
            .count()
    }
}

impl<'a> IntoIterator for &'a Template {
    type Item = &'a TemplatePart;
    type IntoIter = std::slice::Iter<'a, TemplatePart>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.iter()
    }
}

/// What a caller hands to a template entry point.
///
/// Plain strings convert too, so that passing one is a reported error rather
/// than a silently spliced query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryInput {
    Template(Template),
    Text(String),
}

impl From<Template> for QueryInput {
    fn from(template: Template) -> Self {
        QueryInput::Template(template)
    }
}

impl From<&Template> for QueryInput {
    fn from(template: &Template) -> Self {
        QueryInput::Template(template.clone())
    }
}

impl From<String> for QueryInput {
    fn from(text: String) -> Self {
        QueryInput::Text(text)
    }
}

impl From<&str> for QueryInput {
    fn from(text: &str) -> Self {
        QueryInput::Text(text.to_string())
    }
}

/// Split a template into query text with `?` slots and the values for them.
///
/// A template without interpolations is accepted and yields no values.
pub fn sanitize(input: impl Into<QueryInput>) -> Result<(String, Vec<Value>)> {
    let template = match input.into() {
        QueryInput::Template(template) => template,
        QueryInput::Text(_) => {
            return Err(Error::TypeMismatch(
                "expected a structured template, got a plain string".to_string(),
            ))
        }
    };

    let mut sql = String::new();
    let mut args = Vec::with_capacity(template.interpolation_count());
    for part in template.parts {
        match part {
            TemplatePart::Literal(text) => sql.push_str(&text),
            TemplatePart::Interpolation(value) => {
                sql.push('?');
                args.push(value);
            }
        }
    }

    Ok((sql, args))
}

/// Build a [`Template`] from string literals and `{expr}` interpolations.
///
/// ```
/// use secretdb::template;
///
/// let name = "Bob";
/// let t = template!("SELECT secret FROM users WHERE name = ", {name});
/// assert_eq!(t.interpolation_count(), 1);
/// ```
#[macro_export]
macro_rules! template {
    ($($part:tt),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut template = $crate::template::Template::new();
        $( $crate::__template_part!(template, $part); )*
        template
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __template_part {
    ($template:ident, { $value:expr }) => {
        $template.push_interpolation($value)
    };
    ($template:ident, $text:literal) => {
        $template.push_literal($text)
    };
}
