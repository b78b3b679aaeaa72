//! The human side of the authorization code flow
//!
//! The broker never touches a terminal or browser itself. It hands the
//! authorization URL to an [`Operator`] and waits for the full URL the
//! browser was redirected to.

use std::io::{self, BufRead, Write};

use url::Url;

/// Takes an authorization URL to a user and returns the redirect URL
///
/// Implementations may block indefinitely. Closures of the right shape are
/// operators too.
pub trait Operator {
    /// Presents `authorization_url` and returns the URL the browser landed on
    fn obtain_redirect_url(&mut self, authorization_url: &Url) -> io::Result<String>;
}

impl<F> Operator for F
where
    F: FnMut(&Url) -> io::Result<String>,
{
    #[inline]
    fn obtain_redirect_url(&mut self, authorization_url: &Url) -> io::Result<String> {
        self(authorization_url)
    }
}

/// An operator that prints instructions and reads the redirect URL back as a
/// single line
#[derive(Debug)]
pub struct ConsoleOperator<R, W> {
    input: R,
    output: W,
}

impl ConsoleOperator<io::StdinLock<'static>, io::Stdout> {
    /// An operator on the process's standard input and output
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R, W> ConsoleOperator<R, W> {
    /// An operator reading from `input` and writing to `output`
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Operator for ConsoleOperator<R, W> {
    fn obtain_redirect_url(&mut self, authorization_url: &Url) -> io::Result<String> {
        writeln!(
            self.output,
            "1. Paste the following url in a browser:\n\n{}\n",
            authorization_url
        )?;
        writeln!(
            self.output,
            "2. Follow the instructions and paste the resulting url here:\n"
        )?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed before a redirect url was entered",
            ));
        }

        Ok(line.trim().to_owned())
    }
}
