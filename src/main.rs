#![deny(rust_2018_idioms)]

use argh::FromArgs;
use stanza::{DomBuilder, Formatter, Handler, DEFAULT_PARSER};
use std::{
    env,
    fs::File,
    io::{self, BufWriter, Read, Write},
    str::FromStr,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

type Error = Box<dyn std::error::Error>;
type Result<T = (), E = Error> = std::result::Result<T, E>;

/// Feeds an XML file to a stanza session in chunks
#[derive(Debug, FromArgs)]
struct Args {
    /// do not output the parsed XML
    #[argh(switch, short = 'q')]
    quiet: bool,

    /// how many bytes to hand to the parser per call
    #[argh(option)]
    chunk_size: Option<usize>,

    /// print the token stream as indented markup instead of the
    /// completed elements
    #[argh(switch)]
    events: bool,

    /// replace text content with its size when printing elements
    #[argh(switch)]
    secure: bool,

    /// log session activity to stderr.
    ///
    /// `STANZA_LOG` takes a full filter and overrides this.
    #[argh(switch, short = 'v')]
    verbose: bool,

    /// the file to read
    #[argh(positional)]
    filename: String,
}

impl Args {
    const DEFAULT_CHUNK_SIZE: usize = 4 * 1024;

    fn apply_environment_variables(&mut self) {
        self.quiet = self.quiet || env::var_os("QUIET").is_some();

        self.chunk_size.ambient_value("CHUNK_SIZE");
    }

    fn into_options(self) -> Options {
        let Self {
            quiet,
            chunk_size,
            events,
            secure,
            verbose,
            filename,
        } = self;

        let chunk_size = chunk_size.unwrap_or(Self::DEFAULT_CHUNK_SIZE).max(1);
        let output = if events {
            Output::Events
        } else {
            Output::Elements { secure }
        };

        Options {
            quiet,
            chunk_size,
            output,
            verbose,
            filename,
        }
    }
}

#[derive(Debug, Copy, Clone)]
enum Output {
    Events,
    Elements { secure: bool },
}

#[derive(Debug)]
struct Options {
    quiet: bool,
    chunk_size: usize,
    output: Output,
    verbose: bool,
    filename: String,
}

impl Options {
    fn from_env_and_command_line() -> Self {
        let mut args: Args = argh::from_env();
        args.apply_environment_variables();
        args.into_options()
    }
}

trait AmbientValue {
    fn ambient_value(&mut self, env_var_name: &str);
}

impl<T> AmbientValue for Option<T>
where
    T: FromStr,
{
    fn ambient_value(&mut self, env_var_name: &str) {
        if self.is_none() {
            if let Ok(v) = env::var(env_var_name) {
                *self = v.parse().ok();
            }
        }
    }
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("STANZA_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result {
    let Options {
        quiet,
        chunk_size,
        output,
        verbose,
        filename,
    } = Options::from_env_and_command_line();

    init_logging(verbose);

    let file = File::open(&filename)?;
    info!(%filename, chunk_size, ?output, "feeding file");

    if quiet {
        write_output(file, chunk_size, output, io::sink())
    } else {
        let out = io::stdout();
        let out = out.lock();
        let out = BufWriter::new(out);
        write_output(file, chunk_size, output, out)
    }
}

fn write_output(input: impl Read, chunk_size: usize, output: Output, out: impl Write) -> Result {
    match output {
        Output::Events => {
            let mut fmt = Formatter::new(out);
            let fed = feed(input, chunk_size, &mut fmt, |_| Ok(()));
            fmt.finish()?;

            eprintln!("Parsed {} bytes", fed?);
        }

        Output::Elements { secure } => {
            let mut out = out;
            let mut builder = DomBuilder::new();
            let mut count = 0;

            let fed = feed(input, chunk_size, &mut builder, |builder| {
                while let Some(element) = builder.pop_element() {
                    count += 1;
                    if secure {
                        writeln!(out, "{}", element.render_secure())?;
                    } else {
                        writeln!(out, "{}", element)?;
                    }
                }
                Ok(())
            });
            out.flush()?;

            fed?;
            if builder.depth() > 0 {
                eprintln!("Input ended inside {} open elements", builder.depth());
            }
            eprintln!("Parsed {} elements", count);
        }
    }

    Ok(())
}

/// Hands the input to one session, `chunk_size` bytes at a time,
/// calling `after_chunk` once each chunk is processed.
fn feed<H>(
    mut input: impl Read,
    chunk_size: usize,
    handler: &mut H,
    mut after_chunk: impl FnMut(&mut H) -> Result,
) -> Result<usize>
where
    H: Handler,
{
    let mut buffer = vec![0; chunk_size];
    let mut total = 0;

    loop {
        let n = match input.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        // Elements completed before a malformed token still get handed on
        let parsed = DEFAULT_PARSER.parse(handler, &buffer[..n]);
        after_chunk(handler)?;
        parsed?;
        total += n;
    }

    Ok(total)
}
