//! Display surfaces for launch progress.
//!
//! The orchestration functions never print. They emit [`Message`] values to a
//! [`Surface`], and the caller decides where those end up.

use std::io::{self, Write};

use tracing::warn;

/// A single line shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Page title.
    Title(String),
    /// Descriptive or progress text.
    Text(String),
    /// A step completed successfully.
    Success(String),
    /// A step failed.
    Error(String),
}

impl Message {
    /// Return the message text without its kind.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Title(text) | Self::Text(text) | Self::Success(text) | Self::Error(text) => text,
        }
    }
}

/// Sink for launch progress messages, rendered in emission order.
pub trait Surface {
    /// Render one message.
    fn emit(&mut self, message: Message);

    /// Render a title.
    fn title(&mut self, text: impl Into<String>)
    where
        Self: Sized,
    {
        self.emit(Message::Title(text.into()));
    }

    /// Render a line of text.
    fn text(&mut self, text: impl Into<String>)
    where
        Self: Sized,
    {
        self.emit(Message::Text(text.into()));
    }

    /// Render a success line.
    fn success(&mut self, text: impl Into<String>)
    where
        Self: Sized,
    {
        self.emit(Message::Success(text.into()));
    }

    /// Render an error line.
    fn error(&mut self, text: impl Into<String>)
    where
        Self: Sized,
    {
        self.emit(Message::Error(text.into()));
    }
}

impl<S: Surface + ?Sized> Surface for &mut S {
    fn emit(&mut self, message: Message) {
        (**self).emit(message);
    }
}

/// Renders messages as plain terminal lines.
///
/// Titles are underlined, successes carry a check mark, and errors are
/// prefixed with `error:`.
#[derive(Debug)]
pub struct TerminalSurface<W: Write = io::Stdout> {
    writer: W,
}

impl TerminalSurface {
    /// Create a surface writing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self {
            writer: io::stdout(),
        }
    }
}

impl<W: Write> TerminalSurface<W> {
    /// Create a surface writing to `writer`.
    #[must_use]
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Consume the surface and return its writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn render(&mut self, message: &Message) -> io::Result<()> {
        match message {
            Message::Title(text) => {
                writeln!(self.writer, "{text}")?;
                writeln!(self.writer, "{}", "=".repeat(text.chars().count()))
            }
            Message::Text(text) => writeln!(self.writer, "{text}"),
            Message::Success(text) => writeln!(self.writer, "\u{2714} {text}"),
            Message::Error(text) => writeln!(self.writer, "error: {text}"),
        }?;
        self.writer.flush()
    }
}

impl<W: Write> Surface for TerminalSurface<W> {
    fn emit(&mut self, message: Message) {
        if let Err(error) = self.render(&message) {
            warn!(%error, "failed to write to terminal");
        }
    }
}

/// Collects messages in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingSurface {
    messages: Vec<Message>,
}

impl RecordingSurface {
    /// Create an empty recording.
    #[must_use]
    pub const fn new() -> Self {
        Self { messages: vec![] }
    }

    /// Return the recorded messages in emission order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Return the text of every recorded message in emission order.
    #[must_use]
    pub fn lines(&self) -> Vec<&str> {
        self.messages.iter().map(Message::text).collect()
    }

    /// Return the recorded error messages.
    #[must_use]
    pub fn errors(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|message| matches!(message, Message::Error(_)))
            .map(Message::text)
            .collect()
    }
}

impl Surface for RecordingSurface {
    fn emit(&mut self, message: Message) {
        self.messages.push(message);
    }
}
