#![deny(rust_2018_idioms)]

//! Qualified names as they appear on the wire.

/// The prefix every namespace declaration attribute starts with.
pub const XMLNS: &str = "xmlns";

/// A `prefix:local` name. No namespace has been resolved yet; the
/// prefix is just the text before the first colon.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QName<T> {
    pub prefix: Option<T>,
    pub local_part: T,
}

impl<'a> QName<&'a str> {
    /// Splits on the first colon. A name with an empty prefix or an
    /// empty local part is not split, so `:a` and `a:` stay whole.
    pub fn parse(name: &'a str) -> Self {
        match name.split_once(':') {
            Some((prefix, local_part)) if !prefix.is_empty() && !local_part.is_empty() => Self {
                prefix: Some(prefix),
                local_part,
            },
            _ => Self {
                prefix: None,
                local_part: name,
            },
        }
    }

    /// `Some(prefix)` for `xmlns:prefix`, the attribute that binds a
    /// namespace prefix.
    pub fn namespace_declaration(&self) -> Option<&'a str> {
        match self.prefix {
            Some(XMLNS) => Some(self.local_part),
            _ => None,
        }
    }

    /// True for the bare `xmlns` attribute.
    pub fn is_default_namespace_declaration(&self) -> bool {
        self.prefix.is_none() && self.local_part == XMLNS
    }
}
