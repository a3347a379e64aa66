#![deny(rust_2018_idioms)]

//! Values passed from the tokenizer to its consumers.

use std::fmt;

/// One `name="value"` pair from a start tag, with references in the
/// value already decoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl<N, V> From<(N, V)> for Attribute
where
    N: Into<String>,
    V: Into<String>,
{
    fn from(other: (N, V)) -> Self {
        Self::new(other.0, other.1)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={:?}", self.name, self.value)
    }
}

/// An owned copy of a single tokenizer notification.
///
/// Every event is complete: the tokenizer never reports part of a
/// name, value or text run, no matter how the input was chunked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// `<name a="b">` or the opening half of `<name a="b"/>`
    StartElement {
        name: String,
        attributes: Vec<Attribute>,
    },
    /// Decoded text between two tags
    CharData(String),
    /// `</name>` or the closing half of `<name/>`
    EndElement(String),
    /// A comment, CDATA section, declaration or processing
    /// instruction, verbatim
    OtherMarkup(String),
    /// The malformed-input notice
    Error(String),
}

impl Event {
    pub fn start(name: impl Into<String>, attributes: impl IntoIterator<Item = Attribute>) -> Self {
        Event::StartElement {
            name: name.into(),
            attributes: attributes.into_iter().collect(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Event::Error(_))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn attribute_from_tuple() {
        let a = Attribute::from(("to", "juliet@example.com"));
        assert_eq!(a, Attribute::new("to", "juliet@example.com"));
        assert_eq!(a.to_string(), r#"to="juliet@example.com""#);
    }

    #[test]
    fn start_collects_attributes() {
        let e = Event::start("iq", vec![Attribute::new("type", "get")]);

        assert_eq!(
            e,
            Event::StartElement {
                name: "iq".into(),
                attributes: vec![Attribute::new("type", "get")],
            },
        );
        assert!(!e.is_error());
        assert!(Event::Error("bad".into()).is_error());
    }
}
