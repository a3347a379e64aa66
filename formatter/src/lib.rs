#![deny(rust_2018_idioms)]

use parser::{Checkpoint, Handler};
use std::io::{self, Write};
use token::Attribute;
use xml_str::StrExt;

mod escape;

pub use escape::{escape, unescape};

/// Writes the events of a parsing session as indented markup.
///
/// Whitespace-only text is dropped since indentation replaces it.
/// Handler methods cannot fail, so the first I/O error is held and
/// reported by [`Formatter::finish`]; nothing more is written after it.
pub struct Formatter<W> {
    output: W,
    indent: &'static str,
    depth: usize,

    started: bool,
    // A start tag has been written without its closing `>`
    inside_open_tag: bool,
    after_text: bool,

    session: Option<Checkpoint>,
    io_error: Option<io::Error>,
}

impl<W> Formatter<W>
where
    W: Write,
{
    pub fn new(output: W) -> Self {
        Self {
            output,
            indent: "  ",
            depth: 0,
            started: false,
            inside_open_tag: false,
            after_text: false,
            session: None,
            io_error: None,
        }
    }

    /// Flushes the output and returns it.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(e) = self.io_error.take() {
            return Err(e);
        }

        if self.started {
            writeln!(self.output)?;
        }
        self.output.flush()?;
        Ok(self.output)
    }

    fn write(&mut self, f: impl FnOnce(&mut W, &'static str, usize) -> io::Result<()>) {
        if self.io_error.is_some() {
            return;
        }
        if let Err(e) = f(&mut self.output, self.indent, self.depth) {
            self.io_error = Some(e);
        }
    }

    fn close_open_tag(&mut self) {
        if self.inside_open_tag {
            self.write(|o, _, _| write!(o, ">"));
            self.inside_open_tag = false;
        }
    }

    fn new_line(&mut self) {
        if self.started {
            self.write(|o, indent, depth| {
                writeln!(o)?;
                (0..depth).try_for_each(|_| write!(o, "{}", indent))
            });
        }
        self.started = true;
    }
}

impl<W> Handler for Formatter<W>
where
    W: Write,
{
    fn start_element(&mut self, name: &str, attributes: &[Attribute]) {
        self.close_open_tag();
        self.new_line();

        self.write(|o, _, _| {
            write!(o, "<{}", name)?;
            for a in attributes {
                write!(o, r#" {}="{}""#, a.name, escape(&a.value))?;
            }
            Ok(())
        });

        self.depth += 1;
        self.inside_open_tag = true;
        self.after_text = false;
    }

    fn element_cdata(&mut self, text: &str) {
        if text.is_xml_space() {
            return;
        }

        self.close_open_tag();
        self.write(|o, _, _| write!(o, "{}", escape(text)));
        self.started = true;
        self.after_text = true;
    }

    fn end_element(&mut self, name: &str) {
        self.depth = self.depth.saturating_sub(1);

        if self.inside_open_tag {
            self.write(|o, _, _| write!(o, "/>"));
            self.inside_open_tag = false;
        } else {
            if !self.after_text {
                self.new_line();
            }
            self.write(|o, _, _| write!(o, "</{}>", name));
        }

        self.after_text = false;
    }

    fn other_xml(&mut self, markup: &str) {
        self.close_open_tag();
        self.new_line();
        self.write(|o, _, _| write!(o, "{}", markup));
        self.after_text = false;
    }

    fn error(&mut self, error: &parser::Error) {
        self.close_open_tag();
        self.new_line();
        self.write(|o, _, _| write!(o, "<!-- malformed input: {} -->", error));
    }

    fn checkpoint(&mut self, checkpoint: Checkpoint) {
        self.session = Some(checkpoint);
    }

    fn restore(&mut self) -> Option<Checkpoint> {
        self.session.take()
    }
}

#[cfg(test)]
mod test {
    use parser::Parser;

    use super::*;

    type Result<T = (), E = Box<dyn std::error::Error>> = std::result::Result<T, E>;

    fn format(chunks: &[&str]) -> Result<String> {
        let parser = Parser::new();
        let mut f = Formatter::new(vec![]);

        for chunk in chunks {
            parser.parse_str(&mut f, chunk)?;
        }

        Ok(String::from_utf8(f.finish()?)?)
    }

    #[test]
    fn nested_elements_are_indented() -> Result {
        let out = format(&[r#"<a x="1"><b>hi</b><c/></a>"#])?;

        assert_eq!(out, "<a x=\"1\">\n  <b>hi</b>\n  <c/>\n</a>\n");

        Ok(())
    }

    #[test]
    fn existing_whitespace_is_replaced() -> Result {
        let out = format(&["<a>\n     <b/>\n</a>"])?;

        assert_eq!(out, "<a>\n  <b/>\n</a>\n");

        Ok(())
    }

    #[test]
    fn text_and_attributes_are_escaped() -> Result {
        let out = format(&[r#"<a t="&quot;&lt;">x &amp; y</a>"#])?;

        assert_eq!(out, "<a t=\"&quot;&lt;\">x &amp; y</a>\n");

        Ok(())
    }

    #[test]
    fn other_markup_on_its_own_line() -> Result {
        let out = format(&[r#"<?xml version="1.0"?><a><!-- c --></a>"#])?;

        assert_eq!(out, "<?xml version=\"1.0\"?>\n<a>\n  <!-- c -->\n</a>\n");

        Ok(())
    }

    #[test]
    fn chunked_input() -> Result {
        let out = format(&["<stream:str", "eam to='x'><mess", "age>h", "i</message>"])?;

        assert_eq!(
            out,
            "<stream:stream to=\"x\">\n  <message>hi</message>\n"
        );

        Ok(())
    }

    #[test]
    fn malformed_input_is_noted() {
        let parser = Parser::new();
        let mut f = Formatter::new(vec![]);

        assert!(parser.parse_str(&mut f, "<a>&123;</a>").is_err());

        let out = f.finish().map(String::from_utf8);
        assert!(
            matches!(&out, Ok(Ok(s)) if s.starts_with("<a>\n  <!-- malformed input:")),
            "{:?}",
            out,
        );
    }

    #[derive(Debug)]
    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "broken"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn io_errors_are_reported_by_finish() -> Result {
        let mut f = Formatter::new(Broken);
        Parser::new().parse_str(&mut f, "<a/>")?;

        assert!(f.finish().is_err());

        Ok(())
    }
}
