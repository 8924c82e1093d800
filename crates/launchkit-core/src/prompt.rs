//! Prompt primitives.
//!
//! Every question returns [`Answer::Value`] or [`Answer::Back`]. Back is
//! signalled by pressing Escape twice within [`BACK_WINDOW`]; a single press
//! only shows a hint. Prompts marked non-backtrackable swallow the gesture
//! and ask again.
//!
//! The logic lives in [`Prompts`], generic over a raw [`Terminal`]; the
//! wizard talks to the [`Prompter`] trait so tests can script answers.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use regex::Regex;

use crate::error::Result;

/// Two Escape presses closer together than this mean "go back".
pub const BACK_WINDOW: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Answer
// ---------------------------------------------------------------------------

/// A prompt outcome. `Back` is a control signal and is never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer<T> {
    Value(T),
    Back,
}

impl<T> Answer<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Answer<U> {
        match self {
            Answer::Value(v) => Answer::Value(f(v)),
            Answer::Back => Answer::Back,
        }
    }

    pub fn is_back(&self) -> bool {
        matches!(self, Answer::Back)
    }
}

// ---------------------------------------------------------------------------
// Terminal
// ---------------------------------------------------------------------------

/// A raw terminal event: input, or a single Escape press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key<T> {
    Input(T),
    Escape,
}

/// The rendering backend. Implementations report raw events only; the
/// double-Escape rule and validation are applied by [`Prompts`].
pub trait Terminal {
    fn read_line(&mut self, message: &str, default: Option<&str>) -> Result<Key<String>>;

    fn pick(&mut self, message: &str, items: &[String], default: usize) -> Result<Key<usize>>;

    fn pick_many(
        &mut self,
        message: &str,
        items: &[String],
        defaults: &[bool],
    ) -> Result<Key<Vec<usize>>>;

    fn confirm(&mut self, message: &str, default: bool) -> Result<Key<bool>>;

    /// Wait for Enter (or Escape).
    fn wait(&mut self, message: &str) -> Result<Key<()>>;

    fn show(&mut self, text: &str);

    fn now(&self) -> Instant {
        Instant::now()
    }
}

// ---------------------------------------------------------------------------
// EscapeTracker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// First press: show a hint and keep asking.
    Hint,
    /// Second press inside the window.
    Back,
}

/// Rolling double-press detector.
#[derive(Debug, Clone)]
pub struct EscapeTracker {
    window: Duration,
    last: Option<Instant>,
}

impl EscapeTracker {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    pub fn press(&mut self, now: Instant) -> Gesture {
        match self.last {
            Some(prev) if now.saturating_duration_since(prev) <= self.window => {
                self.last = None;
                Gesture::Back
            }
            _ => {
                self.last = Some(now);
                Gesture::Hint
            }
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

impl Default for EscapeTracker {
    fn default() -> Self {
        Self::new(BACK_WINDOW)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validator {
    NonEmpty,
    MinLength(usize),
    /// Sanitized to a slug; must keep at least one letter or digit.
    ProjectName,
    /// `#rgb` or `#rrggbb`, normalized to lowercase `#rrggbb`.
    HexColor,
    Domain,
    /// Anything, including empty.
    Optional,
}

fn hex_color() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#?([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("static regex is valid"))
}

fn domain() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}$")
            .expect("static regex is valid")
    })
}

impl Validator {
    /// The normalized value, or a message explaining the rejection.
    pub fn check(self, raw: &str) -> std::result::Result<String, String> {
        let value = raw.trim();
        match self {
            Validator::Optional => Ok(value.to_string()),
            Validator::NonEmpty if value.is_empty() => Err("A value is required.".into()),
            Validator::NonEmpty => Ok(value.to_string()),
            Validator::MinLength(n) if value.chars().count() < n => {
                Err(format!("Please enter at least {n} characters."))
            }
            Validator::MinLength(_) => Ok(value.to_string()),
            Validator::ProjectName => {
                let slug = slugify(value);
                if slug.is_empty() {
                    Err("Use letters, digits or dashes.".into())
                } else {
                    Ok(slug)
                }
            }
            Validator::HexColor => match hex_color().captures(value) {
                Some(c) => {
                    let hex = c[1].to_ascii_lowercase();
                    let full = if hex.len() == 3 {
                        hex.chars().flat_map(|ch| [ch, ch]).collect()
                    } else {
                        hex
                    };
                    Ok(format!("#{full}"))
                }
                None => Err("Enter a hex colour such as #6366f1.".into()),
            },
            Validator::Domain => {
                let d = value.to_ascii_lowercase();
                if domain().is_match(&d) {
                    Ok(d)
                } else {
                    Err(format!("'{value}' is not a valid domain name."))
                }
            }
        }
    }
}

/// Lowercase, ASCII alphanumerics and single dashes only.
pub fn slugify(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

// ---------------------------------------------------------------------------
// Prompter
// ---------------------------------------------------------------------------

/// A free-text question.
#[derive(Debug, Clone)]
pub struct TextPrompt {
    pub message: String,
    pub default: Option<String>,
    pub validator: Validator,
    pub allow_back: bool,
}

impl TextPrompt {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            default: None,
            validator: Validator::NonEmpty,
            allow_back: true,
        }
    }

    /// Empty defaults are treated as no default.
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        self.default = (!value.is_empty()).then_some(value);
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn allow_back(mut self, allow: bool) -> Self {
        self.allow_back = allow;
        self
    }
}

/// What wizard handlers ask questions through.
pub trait Prompter {
    fn text(&mut self, prompt: &TextPrompt) -> Result<Answer<String>>;

    fn select(
        &mut self,
        message: &str,
        items: &[String],
        default: usize,
        allow_back: bool,
    ) -> Result<Answer<usize>>;

    fn multi_select(
        &mut self,
        message: &str,
        items: &[String],
        defaults: &[bool],
        allow_back: bool,
    ) -> Result<Answer<Vec<usize>>>;

    fn confirm(&mut self, message: &str, default: bool, allow_back: bool) -> Result<Answer<bool>>;

    /// Show `message` and wait for the user to continue.
    fn pause(&mut self, message: &str, allow_back: bool) -> Result<Answer<()>>;

    fn note(&mut self, title: &str, body: &str);

    fn warn(&mut self, message: &str);
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

pub const BACK_HINT: &str = "Press Esc again to go back.";
pub const NO_BACK_HINT: &str = "This is the first step; there is nothing to go back to.";

/// [`Prompter`] over a raw [`Terminal`].
pub struct Prompts<T> {
    term: T,
    escapes: EscapeTracker,
}

impl<T: Terminal> Prompts<T> {
    pub fn new(term: T) -> Self {
        Self {
            term,
            escapes: EscapeTracker::default(),
        }
    }

    pub fn with_window(term: T, window: Duration) -> Self {
        Self {
            term,
            escapes: EscapeTracker::new(window),
        }
    }

    pub fn terminal(&self) -> &T {
        &self.term
    }

    pub fn terminal_mut(&mut self) -> &mut T {
        &mut self.term
    }

    /// Read until a value arrives or the back gesture completes.
    fn ask<R>(
        &mut self,
        allow_back: bool,
        mut read: impl FnMut(&mut T) -> Result<Key<R>>,
    ) -> Result<Answer<R>> {
        self.escapes.reset();
        loop {
            match read(&mut self.term)? {
                Key::Input(v) => {
                    self.escapes.reset();
                    return Ok(Answer::Value(v));
                }
                Key::Escape => {
                    let now = self.term.now();
                    match self.escapes.press(now) {
                        Gesture::Back if allow_back => return Ok(Answer::Back),
                        Gesture::Hint if allow_back => self.term.show(BACK_HINT),
                        Gesture::Back | Gesture::Hint => self.term.show(NO_BACK_HINT),
                    }
                }
            }
        }
    }
}

impl<T: Terminal> Prompter for Prompts<T> {
    fn text(&mut self, prompt: &TextPrompt) -> Result<Answer<String>> {
        loop {
            let raw = self.ask(prompt.allow_back, |t| {
                t.read_line(&prompt.message, prompt.default.as_deref())
            })?;
            let Answer::Value(raw) = raw else {
                return Ok(Answer::Back);
            };
            let raw = match (&prompt.default, raw.trim().is_empty()) {
                (Some(d), true) => d.clone(),
                _ => raw,
            };
            match prompt.validator.check(&raw) {
                Ok(v) => return Ok(Answer::Value(v)),
                Err(msg) => self.term.show(&msg),
            }
        }
    }

    fn select(
        &mut self,
        message: &str,
        items: &[String],
        default: usize,
        allow_back: bool,
    ) -> Result<Answer<usize>> {
        let default = default.min(items.len().saturating_sub(1));
        self.ask(allow_back, |t| t.pick(message, items, default))
    }

    fn multi_select(
        &mut self,
        message: &str,
        items: &[String],
        defaults: &[bool],
        allow_back: bool,
    ) -> Result<Answer<Vec<usize>>> {
        self.ask(allow_back, |t| t.pick_many(message, items, defaults))
    }

    fn confirm(&mut self, message: &str, default: bool, allow_back: bool) -> Result<Answer<bool>> {
        self.ask(allow_back, |t| t.confirm(message, default))
    }

    fn pause(&mut self, message: &str, allow_back: bool) -> Result<Answer<()>> {
        self.ask(allow_back, |t| t.wait(message))
    }

    fn note(&mut self, title: &str, body: &str) {
        if body.is_empty() {
            self.term.show(title);
        } else {
            self.term.show(&format!("{title}\n{body}"));
        }
    }

    fn warn(&mut self, message: &str) {
        self.term.show(&format!("warning: {message}"));
    }
}
