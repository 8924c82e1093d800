//! The console backend for the wizard's prompts.
//!
//! Lists and confirmations are rendered by dialoguer. Free text uses a small
//! line editor on top of `Term::read_key` because dialoguer's `Input` has no
//! way to report an Escape press.

use std::io;

use console::{style, Key as RawKey, Term};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, MultiSelect, Select};
use launchkit_core::prompt::{Key, Terminal};
use launchkit_core::{LaunchError, Result};

pub struct ConsoleTerminal {
    term: Term,
    theme: ColorfulTheme,
}

impl ConsoleTerminal {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
            theme: ColorfulTheme::default(),
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.term.is_term()
    }

    fn render_line(&self, message: &str, default: Option<&str>, buffer: &str) -> io::Result<()> {
        let hint = match default {
            Some(d) if buffer.is_empty() => format!(" {}", style(format!("({d})")).dim()),
            _ => String::new(),
        };
        self.term.clear_line()?;
        self.term.write_str(&format!(
            "{} {}{} {} {}",
            style("?").yellow(),
            style(message).bold(),
            hint,
            style("›").dim(),
            buffer
        ))
    }
}

impl Default for ConsoleTerminal {
    fn default() -> Self {
        Self::new()
    }
}

/// Ctrl-C inside raw-mode reads surfaces as `Interrupted` rather than SIGINT.
fn lift(e: io::Error) -> LaunchError {
    if e.kind() == io::ErrorKind::Interrupted {
        LaunchError::Cancelled
    } else {
        LaunchError::Io(e)
    }
}

fn lift_dialog(e: dialoguer::Error) -> LaunchError {
    let dialoguer::Error::IO(e) = e;
    lift(e)
}

/// Ctrl-C as a raw byte, when the terminal does not turn it into a signal.
const ETX: char = '\u{3}';

fn key<T>(value: Option<T>) -> Key<T> {
    match value {
        Some(v) => Key::Input(v),
        None => Key::Escape,
    }
}

impl Terminal for ConsoleTerminal {
    fn read_line(&mut self, message: &str, default: Option<&str>) -> Result<Key<String>> {
        let mut buffer = String::new();
        self.render_line(message, default, &buffer).map_err(lift)?;
        loop {
            match self.term.read_key().map_err(lift)? {
                RawKey::Enter => {
                    self.term.write_line("").map_err(lift)?;
                    return Ok(Key::Input(buffer));
                }
                RawKey::Escape => {
                    self.term.clear_line().map_err(lift)?;
                    return Ok(Key::Escape);
                }
                RawKey::Char(ETX) => return Err(LaunchError::Cancelled),
                RawKey::Backspace => {
                    buffer.pop();
                }
                RawKey::Char(c) if !c.is_control() => buffer.push(c),
                _ => continue,
            }
            self.render_line(message, default, &buffer).map_err(lift)?;
        }
    }

    fn pick(&mut self, message: &str, items: &[String], default: usize) -> Result<Key<usize>> {
        let choice = Select::with_theme(&self.theme)
            .with_prompt(message)
            .items(items)
            .default(default.min(items.len().saturating_sub(1)))
            .interact_on_opt(&self.term)
            .map_err(lift_dialog)?;
        Ok(key(choice))
    }

    fn pick_many(
        &mut self,
        message: &str,
        items: &[String],
        defaults: &[bool],
    ) -> Result<Key<Vec<usize>>> {
        let chosen = MultiSelect::with_theme(&self.theme)
            .with_prompt(message)
            .items(items)
            .defaults(defaults)
            .interact_on_opt(&self.term)
            .map_err(lift_dialog)?;
        Ok(key(chosen))
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<Key<bool>> {
        let answer = Confirm::with_theme(&self.theme)
            .with_prompt(message)
            .default(default)
            .interact_on_opt(&self.term)
            .map_err(lift_dialog)?;
        Ok(key(answer))
    }

    fn wait(&mut self, message: &str) -> Result<Key<()>> {
        self.term
            .write_str(&format!("{} ", style(message).dim()))
            .map_err(lift)?;
        loop {
            match self.term.read_key().map_err(lift)? {
                RawKey::Enter => {
                    self.term.write_line("").map_err(lift)?;
                    return Ok(Key::Input(()));
                }
                RawKey::Escape => {
                    self.term.clear_line().map_err(lift)?;
                    return Ok(Key::Escape);
                }
                RawKey::Char(ETX) => return Err(LaunchError::Cancelled),
                _ => {}
            }
        }
    }

    fn show(&mut self, text: &str) {
        if let Err(e) = self.term.write_line(text) {
            tracing::debug!(error = %e, "cannot write to terminal");
        }
    }
}
