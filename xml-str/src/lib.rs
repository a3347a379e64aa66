#![cfg_attr(not(test), no_std)]

//! Character classes from the XML 1.0 productions.
//!
//! The tokenizer only ever asks questions about a single character at
//! a time, so everything here is a pure function of its input.

mod sealed {
    pub trait Sealed {}

    impl Sealed for u8 {}
    impl Sealed for char {}
    impl Sealed for str {}
}

pub trait U8Ext: sealed::Sealed {
    #[must_use]
    fn is_xml_space(&self) -> bool;
}

impl U8Ext for u8 {
    #[inline]
    fn is_xml_space(&self) -> bool {
        matches!(*self, b' ' | b'\t' | b'\r' | b'\n')
    }
}

pub trait CharExt: sealed::Sealed {
    /// `Char` in the XML 1.0 grammar. Anything failing this check is
    /// malformed wherever it appears.
    #[must_use]
    fn is_xml_char(&self) -> bool;

    #[must_use]
    fn is_xml_space(&self) -> bool;

    /// `NameStartChar`. The colon is included because namespace
    /// prefixes are lexically part of the name.
    #[must_use]
    fn is_name_start_char(&self) -> bool;

    /// `NameChar`
    #[must_use]
    fn is_name_char(&self) -> bool;
}

impl CharExt for char {
    #[inline]
    fn is_xml_char(&self) -> bool {
        is_xml_codepoint(u32::from(*self))
    }

    #[inline]
    fn is_xml_space(&self) -> bool {
        matches!(self, ' ' | '\t' | '\r' | '\n')
    }

    #[inline]
    fn is_name_start_char(&self) -> bool {
        if matches!(self, ':' | 'A'..='Z' | '_' | 'a'..='z') {
            return true;
        }

        is_name_start_char_non_ascii(*self)
    }

    #[inline]
    fn is_name_char(&self) -> bool {
        if self.is_name_start_char() {
            return true;
        }

        matches!(
            self,
            '-' | '.'
                | '0'..='9'
                | '\u{B7}'
                | '\u{0300}'..='\u{036F}'
                | '\u{203F}'..='\u{2040}'
        )
    }
}

#[inline]
fn is_name_start_char_non_ascii(c: char) -> bool {
    if matches!(c, '\u{C0}'..='\u{2FF}') && c != '\u{D7}' && c != '\u{F7}' {
        return true;
    }

    matches!(
        c,
        '\u{370}'..='\u{37D}'
            | '\u{37F}'..='\u{1FFF}'
            | '\u{200C}'..='\u{200D}'
            | '\u{2070}'..='\u{218F}'
            | '\u{2C00}'..='\u{2FEF}'
            | '\u{3001}'..='\u{D7FF}'
            | '\u{F900}'..='\u{FDCF}'
            | '\u{FDF0}'..='\u{FFFD}'
            | '\u{10000}'..='\u{EFFFF}'
    )
}

/// Checks a raw code point, which may be a surrogate or out of range
/// when it came from a numeric character reference.
#[inline]
#[must_use]
pub const fn is_xml_codepoint(cp: u32) -> bool {
    // Sorted by how common each case is
    matches!(
        cp,
        0x20..=0xD7FF | 0x9 | 0xA | 0xD | 0xE000..=0xFFFD | 0x10000..=0x10FFFF
    )
}

pub trait StrExt: sealed::Sealed {
    #[must_use]
    fn is_xml_space(&self) -> bool;

    /// A non-empty `Name`.
    #[must_use]
    fn is_xml_name(&self) -> bool;
}

impl StrExt for str {
    #[inline]
    fn is_xml_space(&self) -> bool {
        self.bytes().all(|b| b.is_xml_space())
    }

    #[inline]
    fn is_xml_name(&self) -> bool {
        let mut chars = self.chars();

        match chars.next() {
            Some(c) if c.is_name_start_char() => chars.all(|c| c.is_name_char()),
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn name_start_chars_are_name_chars(c in any::<char>()) {
            if c.is_name_start_char() {
                prop_assert!(c.is_name_char());
            }
        }

        #[test]
        fn char_and_codepoint_agree(c in any::<char>()) {
            prop_assert_eq!(c.is_xml_char(), is_xml_codepoint(u32::from(c)));
        }

        #[test]
        fn names_are_valid_xml(s in "[A-Za-z_:][A-Za-z0-9_:.-]{0,16}") {
            prop_assert!(s.is_xml_name());
            prop_assert!(s.chars().all(|c| c.is_xml_char()));
        }
    }

    #[test]
    fn control_characters_are_not_allowed() {
        for c in ['\u{0}', '\u{7}', '\u{B}', '\u{C}', '\u{1F}'] {
            assert!(!c.is_xml_char(), "{:?} should not be allowed", c);
        }
    }

    #[test]
    fn whitespace_controls_are_allowed() {
        for c in ['\t', '\n', '\r'] {
            assert!(c.is_xml_char());
            assert!(c.is_xml_space());
        }
    }

    #[test]
    fn surrogates_and_non_characters_are_not_allowed() {
        assert!(!is_xml_codepoint(0xD800));
        assert!(!is_xml_codepoint(0xDFFF));
        assert!(!is_xml_codepoint(0xFFFE));
        assert!(!is_xml_codepoint(0xFFFF));
        assert!(!is_xml_codepoint(0x110000));
    }

    #[test]
    fn supplementary_planes_are_allowed() {
        assert!(is_xml_codepoint(0x10000));
        assert!(is_xml_codepoint(0x1F600));
        assert!(is_xml_codepoint(0x10FFFF));
        assert!('😀'.is_xml_char());
    }

    #[test]
    fn names() {
        assert!("message".is_xml_name());
        assert!("stream:features".is_xml_name());
        assert!("_a-b.c9".is_xml_name());
        assert!(!"9a".is_xml_name());
        assert!(!"-a".is_xml_name());
        assert!(!"".is_xml_name());
        assert!(!"a b".is_xml_name());
    }

    #[test]
    fn space_strings() {
        assert!(" \t\r\n".is_xml_space());
        assert!("".is_xml_space());
        assert!(!" a ".is_xml_space());
    }
}
