// Bound parameters
// Values supplied separately from the SQL text and substituted into the parsed query

use crate::error::{Error, Result};
use crate::storage::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A parameter slot in query text
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Placeholder {
    /// `?`, `?NNN` or `$NNN`, numbered from 1
    Position(usize),
    /// `:name`
    Named(String),
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placeholder::Position(n) => write!(f, "?{n}"),
            Placeholder::Named(name) => write!(f, ":{name}"),
        }
    }
}

/// Values to bind into a statement
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    Positional(Vec<Value>),
    Named(BTreeMap<String, Value>),
}

impl Default for Params {
    fn default() -> Self {
        Params::Positional(Vec::new())
    }
}

impl Params {
    pub fn positional<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Params::Positional(values.into_iter().map(Into::into).collect())
    }

    pub fn named<K: Into<String>, V: Into<Value>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Params::Named(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        match self {
            Params::Positional(values) => values.len(),
            Params::Named(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reject parameter sets that do not cover the statement's placeholders exactly.
    /// Positional sets must match the highest position used.
    pub(crate) fn check(&self, placeholders: &[&Placeholder]) -> Result<()> {
        let expected = placeholders
            .iter()
            .filter_map(|p| match p {
                Placeholder::Position(n) => Some(*n),
                Placeholder::Named(_) => None,
            })
            .max()
            .unwrap_or(0);
        let mut names = placeholders.iter().filter_map(|p| match p {
            Placeholder::Named(name) => Some(name.as_str()),
            Placeholder::Position(_) => None,
        });

        match self {
            Params::Positional(values) => {
                if let Some(name) = names.next() {
                    return Err(Error::MissingParameter(name.to_string()));
                }
                if values.len() != expected {
                    return Err(Error::BindingCount {
                        expected,
                        supplied: values.len(),
                    });
                }
            }
            Params::Named(map) => {
                if expected > 0 {
                    return Err(Error::BindingCount {
                        expected,
                        supplied: 0,
                    });
                }
                if let Some(name) = names.find(|name| !map.contains_key(*name)) {
                    return Err(Error::MissingParameter(name.to_string()));
                }
            }
        }

        Ok(())
    }

    pub(crate) fn resolve(&self, placeholder: &Placeholder) -> Result<Value> {
        let value = match (self, placeholder) {
            (Params::Positional(values), Placeholder::Position(n)) => {
                n.checked_sub(1).and_then(|i| values.get(i))
            }
            (Params::Named(map), Placeholder::Named(name)) => map.get(name),
            _ => None,
        };
        value
            .cloned()
            .ok_or_else(|| Error::MissingParameter(placeholder.to_string()))
    }
}

impl From<()> for Params {
    fn from(_: ()) -> Self {
        Params::default()
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Params::Positional(values)
    }
}

impl<const N: usize> From<[Value; N]> for Params {
    fn from(values: [Value; N]) -> Self {
        Params::Positional(values.into())
    }
}

impl From<BTreeMap<String, Value>> for Params {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Params::Named(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_count_must_match_highest_position() {
        let one = Placeholder::Position(1);
        let three = Placeholder::Position(3);

        assert!(Params::positional(["a", "b", "c"])
            .check(&[&one, &three])
            .is_ok());

        let err = Params::positional(["a"]).check(&[&one, &three]).unwrap_err();
        assert!(matches!(
            err,
            Error::BindingCount {
                expected: 3,
                supplied: 1
            }
        ));
    }

    #[test]
    fn test_extra_values_without_placeholders_are_rejected() {
        let err = Params::positional(["stray"]).check(&[]).unwrap_err();
        assert!(matches!(
            err,
            Error::BindingCount {
                expected: 0,
                supplied: 1
            }
        ));
    }

    #[test]
    fn test_named_parameters() {
        let name = Placeholder::Named("name".to_string());
        let params = Params::named([("name", "Bob")]);

        assert!(params.check(&[&name]).is_ok());
        assert_eq!(params.resolve(&name).unwrap(), Value::from("Bob"));

        let other = Placeholder::Named("secret".to_string());
        assert!(matches!(
            params.check(&[&other]),
            Err(Error::MissingParameter(n)) if n == "secret"
        ));
    }

    #[test]
    fn test_named_slot_with_positional_params() {
        let name = Placeholder::Named("name".to_string());
        assert!(matches!(
            Params::default().check(&[&name]),
            Err(Error::MissingParameter(_))
        ));
    }
}
