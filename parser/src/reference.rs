//! Character and entity references.

use snafu::{ensure, OptionExt, ResultExt, Snafu};
use xml_str::{CharExt, StrExt};

/// What a complete `&...;` span stands for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Entity<'a> {
    /// One of the five predefined entities or a numeric reference.
    Char(char),
    /// A well-formed reference to an entity we do not know. It is
    /// carried through as the literal span, `&` and `;` included.
    Literal(&'a str),
}

impl Entity<'_> {
    pub fn push_to(&self, out: &mut String) {
        match *self {
            Entity::Char(c) => out.push(c),
            Entity::Literal(s) => out.push_str(s),
        }
    }

    /// Bytes this adds to the decoded text.
    pub fn text_len(&self) -> usize {
        match *self {
            Entity::Char(c) => c.len_utf8(),
            Entity::Literal(s) => s.len(),
        }
    }
}

/// Resolves a complete reference span such as `&amp;`, `&#60;` or
/// `&#x1F600;`.
pub fn decode_entity(span: &str) -> Result<Entity<'_>, EntityError> {
    let body = span
        .strip_prefix('&')
        .context(NotAReferenceSnafu { span })?;
    let body = body
        .strip_suffix(';')
        .context(UnterminatedSnafu { span })?;

    ensure!(!body.is_empty(), EmptySnafu);

    if let Some(hex) = body.strip_prefix("#x") {
        return reference_value(hex, 16).map(Entity::Char);
    }
    if let Some(decimal) = body.strip_prefix('#') {
        return reference_value(decimal, 10).map(Entity::Char);
    }

    if let Some(c) = predefined_entity(body) {
        return Ok(Entity::Char(c));
    }

    ensure!(body.is_xml_name(), InvalidNameSnafu { name: body });

    Ok(Entity::Literal(span))
}

fn predefined_entity(name: &str) -> Option<char> {
    Some(match name {
        "lt" => '<',
        "gt" => '>',
        "amp" => '&',
        "quot" => '"',
        "apos" => '\'',
        _ => return None,
    })
}

fn reference_value(value: &str, radix: u32) -> Result<char, EntityError> {
    // `from_str_radix` would otherwise accept a leading `+`
    ensure!(
        value.chars().all(|c| c.is_digit(radix)),
        InvalidDigitsSnafu { value }
    );
    let value = u32::from_str_radix(value, radix).context(InvalidValueSnafu { value })?;
    let value = char::from_u32(value).context(InvalidUnicodeCharacterSnafu { value })?;
    ensure!(value.is_xml_char(), DisallowedCharacterSnafu { value });
    Ok(value)
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum EntityError {
    #[snafu(display("{:?} does not start with an ampersand", span))]
    NotAReference { span: String },

    #[snafu(display("The reference {:?} is missing its semicolon", span))]
    Unterminated { span: String },

    #[snafu(display("The reference is empty"))]
    Empty,

    #[snafu(display("{:?} is not a valid entity name", name))]
    InvalidName { name: String },

    #[snafu(display("{:?} contains characters that are not digits", value))]
    InvalidDigits { value: String },

    #[snafu(display("{:?} is not a number", value))]
    InvalidValue {
        source: std::num::ParseIntError,
        value: String,
    },

    #[snafu(display("{:#X} is not a Unicode scalar value", value))]
    InvalidUnicodeCharacter { value: u32 },

    #[snafu(display("{:?} is not allowed in XML", value))]
    DisallowedCharacter { value: char },
}
