#![deny(rust_2018_idioms)]

use proptest::prelude::*;
use stanza::{DomBuilder, Element, Event, EventLog, Formatter, Node, Parser, DEFAULT_PARSER};

type BoxError = Box<dyn std::error::Error>;
type Result<T = (), E = BoxError> = std::result::Result<T, E>;

#[test]
fn round_trips_xml() -> Result {
    let input = r#"
<?xml version="1.0"?>
<a name="a">
  <b1 name="b1" xmlns:ns1="1" xmlns:ns2="2"/>
  <!--hello-->
  <b3 name="b3">x &amp; y</b3>
  <?hello world?>
</a>
"#
    .trim_start();

    let mut output = Vec::new();
    let mut fmt = Formatter::new(&mut output);
    DEFAULT_PARSER.parse_str(&mut fmt, input)?;
    fmt.finish()?;

    let output = String::from_utf8(output)?;

    assert_eq!(input, output);

    Ok(())
}

#[test]
fn rendered_elements_parse_back_to_the_same_tree() -> Result {
    let input = concat!(
        r#"<message to="juliet@example.com" type="chat">"#,
        r#"<body>Wherefore art thou, &lt;Romeo&gt;?</body>"#,
        r#"<thread parent="e0ffe42b"/>"#,
        "</message>",
    );

    let first = stanza::parse_str(input)?;
    assert_eq!(first.len(), 1);

    let rendered = first[0].to_string();
    assert_eq!(rendered, input);

    let second = stanza::parse_str(&rendered)?;
    assert_eq!(first, second);

    Ok(())
}

#[test]
fn a_stream_of_stanzas() -> Result {
    let chunks = [
        r#"<?xml version='1.0'?><stream:stream xmlns='jabber:client' "#,
        r#"xmlns:stream='http://etherx.jabber.org/streams'>"#,
        "<message><body>one</bo",
        "dy></message><message><body>tw",
        "o</body></message>",
    ];

    let mut builder = DomBuilder::new();
    let mut bodies = Vec::new();

    for chunk in chunks {
        DEFAULT_PARSER.parse_str(&mut builder, chunk)?;

        // The stream element stays open, so every message is its child
        while let Some(e) = builder.pop_element() {
            bodies.push(e.child_cdata(&["message", "body"]));
        }
    }

    assert!(bodies.is_empty());
    assert_eq!(builder.depth(), 1);

    DEFAULT_PARSER.parse_str(&mut builder, "</stream:stream>")?;
    let stream = builder.pop_element().ok_or("stream did not complete")?;

    assert_eq!(stream.name(), "stream");
    assert_eq!(stream.xmlns(), Some("http://etherx.jabber.org/streams"));

    let bodies = stream.map_children(|m| m.child_cdata(&["message", "body"]));
    assert_eq!(bodies, [Some("one".to_owned()), Some("two".to_owned())]);

    Ok(())
}

const DOCUMENT: &str = concat!(
    "<?xml version=\"1.0\"?>",
    r#"<root a="1" b='&#x263A;'>"#,
    "text &amp; more &#128512; caf\u{e9}",
    "<!-- comment --><![CDATA[<raw>]]>",
    r#"<child x="&quot;q&quot;"/>"#,
    "<p:n xmlns:p=\"urn:p\">&unknown;</p:n>",
    "</root>",
);

fn split_at_points(input: &[u8], mut points: Vec<usize>) -> Vec<&[u8]> {
    points.sort_unstable();

    let mut chunks = Vec::with_capacity(points.len() + 1);
    let mut start = 0;
    for p in points {
        chunks.push(&input[start..p]);
        start = p;
    }
    chunks.push(&input[start..]);
    chunks
}

proptest! {
    #[test]
    fn chunking_does_not_change_events_or_trees(
        points in prop::collection::vec(0..=DOCUMENT.len(), 0..12),
    ) {
        let parser = Parser::new();
        let input = DOCUMENT.as_bytes();

        let mut whole_log = EventLog::new();
        let mut whole_tree = DomBuilder::new();
        prop_assert!(parser.parse(&mut whole_log, input).is_ok());
        prop_assert!(parser.parse(&mut whole_tree, input).is_ok());

        let mut split_log = EventLog::new();
        let mut split_tree = DomBuilder::new();
        for chunk in split_at_points(input, points) {
            prop_assert!(parser.parse(&mut split_log, chunk).is_ok());
            prop_assert!(parser.parse(&mut split_tree, chunk).is_ok());
        }

        prop_assert!(!whole_log.events().iter().any(Event::is_error));
        prop_assert_eq!(whole_log.events(), split_log.events());

        let whole = whole_tree.take_elements();
        let split = split_tree.take_elements();
        prop_assert_eq!(whole.len(), 1);
        prop_assert_eq!(whole, split);
    }
}

fn name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,3}"
}

fn attributes() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::btree_map(name(), "[a-z&<>\"' ]{0,6}", 0..3)
        .prop_map(|attributes| attributes.into_iter().collect())
}

fn element(name: String, attributes: Vec<(String, String)>, children: Vec<Node>) -> Element {
    let mut element = Element::new(name);
    for (k, v) in attributes {
        element.set_attribute(k, v);
    }
    for child in children {
        match child {
            // Adjacent text parses back as a single node
            Node::Text(t) => element.append_cdata(&t),
            Node::Element(e) => element.add_child(e),
        }
    }
    element
}

fn tree() -> impl Strategy<Value = Element> {
    let leaf = (name(), attributes()).prop_map(|(n, a)| element(n, a, Vec::new()));

    leaf.prop_recursive(3, 24, 4, |inner| {
        let child = prop_oneof![
            inner.prop_map(Node::Element),
            "[a-z][a-z&<>\"' ]{0,7}".prop_map(Node::Text),
        ];

        (name(), attributes(), prop::collection::vec(child, 0..4))
            .prop_map(|(n, a, c)| element(n, a, c))
    })
}

proptest! {
    #[test]
    fn rendered_trees_parse_back_unchanged(original in tree()) {
        let rendered = original.to_string();

        let parsed = stanza::parse_str(&rendered);
        let expected: stanza::Result<Vec<Element>> = Ok(vec![original]);
        prop_assert_eq!(parsed, expected, "rendered as {}", rendered);
    }
}
