#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
//! Terminal output for scrub.
//!
//! The [`Output`] trait covers everything the CLI shows the user: colored
//! status lines, indented sections, key/value detail lines, single-key choices
//! and progress spinners. Two backends are provided:
//!
//! - [`Terminal`]: colored output on stdout with raw-mode key selection
//! - [`Quiet`]: discards messages and refuses to prompt

use std::{
    collections::HashSet,
    io::{self, Write},
    result::Result as StdResult,
    time::Duration,
};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal,
};
use indicatif::{ProgressBar, ProgressStyle};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use thiserror::Error;

/// Spaces added per nested section.
const INDENT: usize = 4;

/// Width used for wrapping when the terminal size is unknown.
const FALLBACK_WIDTH: usize = 100;

/// Spinner redraw interval.
const TICK: Duration = Duration::from_millis(100);

/// ASCII control representation of `Ctrl+C`.
const CTRL_C: char = '\u{3}';

/// Whether the key press cancels an interactive prompt (`Ctrl+C` or `Esc`).
fn is_cancel_key(code: KeyCode, modifiers: KeyModifiers) -> bool {
    match code {
        KeyCode::Char(ch) => {
            ch == CTRL_C
                || (modifiers.contains(KeyModifiers::CONTROL) && ch.eq_ignore_ascii_case(&'c'))
        }
        KeyCode::Esc => true,
        _ => false,
    }
}

/// Errors produced by [`Output`] implementations.
#[derive(Debug, Error)]
pub enum OutputError {
    /// The backend cannot perform the operation.
    #[error("{0}")]
    Unsupported(&'static str),

    /// The caller supplied unusable arguments.
    #[error("{0}")]
    InvalidInput(&'static str),

    /// A terminal/TTY related failure occurred.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Writing to or reading from the terminal failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The user cancelled an interactive prompt.
    #[error("Selection cancelled")]
    Cancelled,
}

/// Convenience alias for output-related fallible operations.
pub type Result<T> = StdResult<T, OutputError>;

/// One option of a single-key choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    /// Key that selects the option, compared case-insensitively.
    pub key: char,
    /// Text shown for the option.
    pub label: String,
}

impl Choice {
    /// Create a choice selected by `key`.
    pub fn new(key: char, label: impl Into<String>) -> Self {
        Self {
            key: key.to_ascii_lowercase(),
            label: label.into(),
        }
    }
}

/// Reject empty choice lists and duplicate keys.
fn validate_choices(choices: &[Choice]) -> Result<()> {
    if choices.is_empty() {
        return Err(OutputError::InvalidInput("No choices provided"));
    }
    let mut seen = HashSet::new();
    if !choices.iter().all(|c| seen.insert(c.key)) {
        return Err(OutputError::InvalidInput("Choice keys must be unique"));
    }
    Ok(())
}

/// Index of the choice selected by a typed character.
fn match_choice(ch: char, choices: &[Choice]) -> Option<usize> {
    let lower = ch.to_ascii_lowercase();
    choices.iter().position(|c| c.key == lower)
}

/// Wrap `text` to `width` columns, prefixing every line with `indent`.
fn wrap_indented(text: &str, indent: &str, width: usize) -> String {
    let options = textwrap::Options::new(width.max(indent.len() + 20))
        .initial_indent(indent)
        .subsequent_indent(indent);
    textwrap::fill(text, options)
}

/// Current terminal width, or a fallback when not attached to a terminal.
fn terminal_width() -> usize {
    terminal::size()
        .map(|(cols, _)| usize::from(cols))
        .unwrap_or(FALLBACK_WIDTH)
}

/// A progress spinner tied to an [`Output`]; hidden for quiet backends.
pub struct Spinner {
    /// The underlying progress bar.
    bar: ProgressBar,
}

impl Spinner {
    /// A spinner showing `msg`.
    fn visible(msg: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.set_message(msg.to_string());
        bar.enable_steady_tick(TICK);
        Self { bar }
    }

    /// A spinner that never draws.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Replace the spinner's message.
    pub fn set_message(&self, msg: &str) {
        self.bar.set_message(msg.to_string());
    }

    /// Stop and erase the spinner.
    pub fn finish(self) {
        self.bar.finish_and_clear();
    }
}

/// Abstraction over how user-facing messages and prompts are produced.
pub trait Output {
    /// Print an informational message.
    fn message(&self, msg: &str) -> Result<()>;
    /// Print a success message.
    fn success(&self, msg: &str) -> Result<()>;
    /// Print a warning message.
    fn warn(&self, msg: &str) -> Result<()>;
    /// Print an error/failure message.
    fn fail(&self, msg: &str) -> Result<()>;
    /// Print a `label: detail` line, wrapping long details.
    fn item(&self, label: &str, detail: &str) -> Result<()>;
    /// Ask the user to pick one of `choices` with a single key; returns its index.
    fn select(&self, prompt: &str, choices: &[Choice]) -> Result<usize>;
    /// Print `header` and return an output that indents beneath it.
    fn section(&self, header: &str) -> Box<dyn Output>;
    /// Start a spinner showing `msg`.
    fn spinner(&self, msg: &str) -> Spinner;
    /// Flush any buffered output.
    fn finish(&self) -> Result<()>;
}

/// Output that prints nothing and refuses to prompt.
pub struct Quiet;

impl Output for Quiet {
    fn message(&self, _msg: &str) -> Result<()> {
        Ok(())
    }

    fn success(&self, _msg: &str) -> Result<()> {
        Ok(())
    }

    fn warn(&self, _msg: &str) -> Result<()> {
        Ok(())
    }

    fn fail(&self, _msg: &str) -> Result<()> {
        Ok(())
    }

    fn item(&self, _label: &str, _detail: &str) -> Result<()> {
        Ok(())
    }

    fn select(&self, _prompt: &str, _choices: &[Choice]) -> Result<usize> {
        Err(OutputError::Unsupported("Cannot prompt in quiet mode"))
    }

    fn section(&self, _header: &str) -> Box<dyn Output> {
        Box::new(Self)
    }

    fn spinner(&self, _msg: &str) -> Spinner {
        Spinner::hidden()
    }

    fn finish(&self) -> Result<()> {
        Ok(())
    }
}

/// Color-capable terminal renderer.
pub struct Terminal {
    /// Whether ANSI colors are written.
    color_choice: ColorChoice,
    /// Current indentation depth in spaces.
    indent: usize,
}

impl Terminal {
    /// Create a terminal output; `color` forces colors on or off.
    pub fn new(color: bool) -> Self {
        let color_choice = if color {
            ColorChoice::Always
        } else {
            ColorChoice::Never
        };
        Self {
            color_choice,
            indent: 0,
        }
    }

    /// Leading whitespace for the current depth.
    fn pad(&self) -> String {
        " ".repeat(self.indent)
    }

    /// Write `msg` in `color` at the current indentation.
    fn write_colored(&self, msg: &str, color: Color) -> Result<()> {
        let mut stdout = StandardStream::stdout(self.color_choice);
        stdout.set_color(ColorSpec::new().set_fg(Some(color)))?;
        writeln!(stdout, "{}{msg}", self.pad())?;
        stdout.reset()?;
        stdout.flush()?;
        Ok(())
    }

    /// Render one choice with its key highlighted.
    fn write_choice(&self, stdout: &mut StandardStream, choice: &Choice) -> Result<()> {
        write!(stdout, "{}  ", self.pad())?;
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
        write!(stdout, "[{}]", choice.key)?;
        stdout.reset()?;
        writeln!(stdout, " {}", choice.label)?;
        Ok(())
    }

    /// Block until a choice key or a cancel key is pressed.
    fn read_choice(choices: &[Choice]) -> Result<usize> {
        loop {
            let Event::Key(KeyEvent {
                code,
                modifiers,
                kind,
                ..
            }) = event::read().map_err(|e| OutputError::Terminal(e.to_string()))?
            else {
                continue;
            };
            if kind != KeyEventKind::Press {
                continue;
            }
            if is_cancel_key(code, modifiers) {
                return Err(OutputError::Cancelled);
            }
            if let KeyCode::Char(ch) = code
                && let Some(index) = match_choice(ch, choices)
            {
                return Ok(index);
            }
        }
    }
}

impl Output for Terminal {
    fn message(&self, msg: &str) -> Result<()> {
        self.write_colored(msg, Color::Cyan)
    }

    fn success(&self, msg: &str) -> Result<()> {
        self.write_colored(msg, Color::Green)
    }

    fn warn(&self, msg: &str) -> Result<()> {
        self.write_colored(msg, Color::Rgb(255, 165, 0))
    }

    fn fail(&self, msg: &str) -> Result<()> {
        self.write_colored(msg, Color::Red)
    }

    fn item(&self, label: &str, detail: &str) -> Result<()> {
        let mut stdout = StandardStream::stdout(self.color_choice);
        stdout.set_color(ColorSpec::new().set_bold(true))?;
        write!(stdout, "{}{label}:", self.pad())?;
        stdout.reset()?;

        let width = terminal_width();
        if label.len() + detail.len() + self.indent + 2 <= width {
            writeln!(stdout, " {detail}")?;
        } else {
            let continuation = " ".repeat(self.indent + INDENT);
            writeln!(stdout)?;
            writeln!(stdout, "{}", wrap_indented(detail, &continuation, width))?;
        }
        stdout.flush()?;
        Ok(())
    }

    fn select(&self, prompt: &str, choices: &[Choice]) -> Result<usize> {
        validate_choices(choices)?;

        let mut stdout = StandardStream::stdout(self.color_choice);
        writeln!(stdout, "{}{prompt}", self.pad())?;
        for choice in choices {
            self.write_choice(&mut stdout, choice)?;
        }
        write!(stdout, "{} > ", self.pad())?;
        stdout.flush()?;

        terminal::enable_raw_mode().map_err(|e| OutputError::Terminal(e.to_string()))?;
        let result = Self::read_choice(choices);
        terminal::disable_raw_mode().map_err(|e| OutputError::Terminal(e.to_string()))?;

        match result {
            Ok(index) => {
                writeln!(stdout, "{}", choices[index].key)?;
                Ok(index)
            }
            Err(e) => {
                writeln!(stdout)?;
                Err(e)
            }
        }
    }

    fn section(&self, header: &str) -> Box<dyn Output> {
        // A failed header write surfaces on the next write to the section.
        self.message(header).ok();
        Box::new(Self {
            color_choice: self.color_choice,
            indent: self.indent + INDENT,
        })
    }

    fn spinner(&self, msg: &str) -> Spinner {
        Spinner::visible(msg)
    }

    fn finish(&self) -> Result<()> {
        io::stdout().flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choices() -> Vec<Choice> {
        vec![
            Choice::new('y', "Delete"),
            Choice::new('n', "Keep for later"),
            Choice::new('s', "Skip"),
        ]
    }

    #[test]
    fn test_quiet_select_returns_error() {
        let result = Quiet.select("Delete?", &choices());
        assert!(matches!(result, Err(OutputError::Unsupported(_))));
    }

    #[test]
    fn test_select_rejects_bad_choices() {
        let terminal = Terminal::new(false);
        assert!(matches!(
            terminal.select("Choose:", &[]),
            Err(OutputError::InvalidInput(_))
        ));
        let duplicated = [Choice::new('a', "one"), Choice::new('A', "two")];
        assert!(matches!(
            terminal.select("Choose:", &duplicated),
            Err(OutputError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_match_choice_is_case_insensitive() {
        let choices = choices();
        assert_eq!(match_choice('Y', &choices), Some(0));
        assert_eq!(match_choice('s', &choices), Some(2));
        assert_eq!(match_choice('x', &choices), None);
    }

    #[test]
    fn test_cancel_keys() {
        assert!(is_cancel_key(KeyCode::Esc, KeyModifiers::NONE));
        assert!(is_cancel_key(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(is_cancel_key(KeyCode::Char(CTRL_C), KeyModifiers::NONE));
        assert!(!is_cancel_key(KeyCode::Char('c'), KeyModifiers::NONE));
        assert!(!is_cancel_key(KeyCode::Enter, KeyModifiers::NONE));
    }

    #[test]
    fn test_wrap_indents_every_line() {
        let text = "word ".repeat(30);
        let wrapped = wrap_indented(text.trim(), "    ", 40);
        assert!(wrapped.lines().count() > 1);
        assert!(wrapped.lines().all(|l| l.starts_with("    ") && l.len() <= 40));
    }

    #[test]
    fn test_hidden_spinner_finishes() {
        let spinner = Quiet.spinner("cloning");
        spinner.set_message("checking");
        spinner.finish();
    }
}
