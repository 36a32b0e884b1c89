//! Where streamed answer text goes.

use std::io::{self, IsTerminal, Stdout, Write};

/// Receives answer fragments in stream order plus status lines.
pub trait RenderSink {
    fn fragment(&mut self, text: &str) -> io::Result<()>;

    fn status(&mut self, line: &str) -> io::Result<()>;

    /// Called once with the complete answer after a successful stream.
    fn finish(&mut self, answer: &str) -> io::Result<()>;
}

/// Writes fragments as they arrive when the output is a terminal, otherwise
/// writes the whole answer once it is complete.
#[derive(Debug)]
pub struct StdoutSink<W: Write = Stdout> {
    out: W,
    progressive: bool,
    mid_line: bool,
}

impl StdoutSink<Stdout> {
    pub fn stdout() -> Self {
        let out = io::stdout();
        let progressive = out.is_terminal();
        Self::new(out, progressive)
    }
}

impl<W: Write> StdoutSink<W> {
    pub fn new(out: W, progressive: bool) -> Self {
        Self {
            out,
            progressive,
            mid_line: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RenderSink for StdoutSink<W> {
    fn fragment(&mut self, text: &str) -> io::Result<()> {
        if !self.progressive || text.is_empty() {
            return Ok(());
        }
        self.out.write_all(text.as_bytes())?;
        self.mid_line = !text.ends_with('\n');
        self.out.flush()
    }

    fn status(&mut self, line: &str) -> io::Result<()> {
        if self.mid_line {
            writeln!(self.out)?;
            self.mid_line = false;
        }
        writeln!(self.out, "{line}")?;
        self.out.flush()
    }

    fn finish(&mut self, answer: &str) -> io::Result<()> {
        if !self.progressive {
            self.out.write_all(answer.as_bytes())?;
            self.mid_line = !answer.is_empty() && !answer.ends_with('\n');
        }
        if self.mid_line {
            writeln!(self.out)?;
            self.mid_line = false;
        }
        self.out.flush()
    }
}
