use std::borrow::Cow;

const ENTITIES: [(char, &str); 5] = [
    ('&', "&amp;"),
    ('<', "&lt;"),
    ('>', "&gt;"),
    ('"', "&quot;"),
    ('\'', "&apos;"),
];

fn entity_for(c: char) -> Option<&'static str> {
    ENTITIES.iter().find(|(d, _)| *d == c).map(|(_, e)| *e)
}

/// Replaces `& < > " '` with the predefined entities. Borrows when
/// there is nothing to replace.
pub fn escape(s: &str) -> Cow<'_, str> {
    let first = match s.find(|c| entity_for(c).is_some()) {
        Some(i) => i,
        None => return Cow::Borrowed(s),
    };

    let mut out = String::with_capacity(s.len() + 8);
    out.push_str(&s[..first]);

    for c in s[first..].chars() {
        match entity_for(c) {
            Some(e) => out.push_str(e),
            None => out.push(c),
        }
    }

    Cow::Owned(out)
}

/// The inverse of [`escape`]. Only the five predefined entities are
/// recognised, in a single left-to-right pass, so
/// `unescape(&escape(s)) == s` for every `s`.
pub fn unescape(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(i) = rest.find('&') {
        out.push_str(&rest[..i]);
        rest = &rest[i..];

        match ENTITIES.iter().find(|(_, e)| rest.starts_with(e)) {
            Some((d, e)) => {
                out.push(*d);
                rest = &rest[e.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);

    Cow::Owned(out)
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn escapes_all_five() {
        assert_eq!(
            escape("<\"&><foo>;'"),
            "&lt;&quot;&amp;&gt;&lt;foo&gt;;&apos;"
        );
    }

    #[test]
    fn nothing_to_escape_borrows() {
        assert!(matches!(escape("hello"), Cow::Borrowed("hello")));
        assert!(matches!(unescape("hello"), Cow::Borrowed("hello")));
    }

    #[test]
    fn unescapes_all_five() {
        assert_eq!(unescape("&lt;&quot;&amp;&gt;&apos;"), "<\"&>'");
    }

    #[test]
    fn unknown_references_are_left_alone() {
        assert_eq!(unescape("&nbsp; & &#60; &amp"), "&nbsp; & &#60; &amp");
    }

    #[test]
    fn escaped_entities_survive_a_round_trip() {
        let s = "<&quot;&amp;&gt;&lt;foo>;'";
        assert_eq!(unescape(&escape(s)), s);
    }

    #[test]
    fn unescape_is_a_single_pass() {
        assert_eq!(unescape("&amp;lt;"), "&lt;");
    }

    proptest! {
        #[test]
        fn round_trip(s in r#"[a&;<>"'ltgmpquos]{0,32}"#) {
            let escaped = escape(&s);
            prop_assert_eq!(unescape(&escaped), s.as_str());
        }

        #[test]
        fn round_trip_any(s in any::<String>()) {
            let escaped = escape(&s);
            prop_assert_eq!(unescape(&escaped), s.as_str());
        }

        #[test]
        fn escaped_text_has_no_markup(s in any::<String>()) {
            let e = escape(&s);
            prop_assert!(!e.contains(&['<', '>', '"', '\''][..]));
        }
    }
}
