use crate::{
    error::{Result, StampError},
    models::{GeneratedResult, HistoryItem},
};
use chrono::Local;
use colored::*;
use std::time::{Duration, Instant};

/// How long a "copied" acknowledgement stays visible.
pub const COPY_ACK: Duration = Duration::from_secs(2);

const RESULT_TAGS: [&str; 3] = ["8K", "3D Render", "Octane"];

pub trait Clipboard {
    fn set_text(&mut self, text: &str) -> Result<()>;
}

#[cfg(feature = "clipboard")]
pub struct SystemClipboard {
    inner: arboard::Clipboard,
    hold: bool,
}

#[cfg(feature = "clipboard")]
impl SystemClipboard {
    pub fn new() -> Result<Self> {
        let inner = arboard::Clipboard::new().map_err(|e| StampError::Clipboard(e.to_string()))?;
        Ok(Self { inner, hold: false })
    }

    /// Keep serving copied text until another program replaces it. On Linux
    /// the owning process serves the selection, so a short-lived process
    /// needs this for the text to outlive it.
    pub fn hold_until_replaced(mut self) -> Self {
        self.hold = true;
        self
    }

    /// Whether `set_text` blocks until the clipboard changes.
    pub fn blocks_on_set(&self) -> bool {
        self.hold && cfg!(target_os = "linux")
    }
}

#[cfg(all(feature = "clipboard", target_os = "linux"))]
fn set_held(inner: &mut arboard::Clipboard, text: &str) -> std::result::Result<(), arboard::Error> {
    use arboard::SetExtLinux;
    inner.set().wait().text(text.to_string())
}

#[cfg(all(feature = "clipboard", not(target_os = "linux")))]
fn set_held(inner: &mut arboard::Clipboard, text: &str) -> std::result::Result<(), arboard::Error> {
    inner.set_text(text.to_string())
}

#[cfg(feature = "clipboard")]
impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        let result = if self.hold {
            set_held(&mut self.inner, text)
        } else {
            self.inner.set_text(text.to_string())
        };
        result.map_err(|e| StampError::Clipboard(e.to_string()))
    }
}

#[cfg(not(feature = "clipboard"))]
pub struct SystemClipboard;

#[cfg(not(feature = "clipboard"))]
impl SystemClipboard {
    pub fn new() -> Result<Self> {
        Err(StampError::Clipboard(
            "clipboard feature not enabled in this build".into(),
        ))
    }

    pub fn hold_until_replaced(self) -> Self {
        self
    }

    pub fn blocks_on_set(&self) -> bool {
        false
    }
}

#[cfg(not(feature = "clipboard"))]
impl Clipboard for SystemClipboard {
    fn set_text(&mut self, _text: &str) -> Result<()> {
        Err(StampError::Clipboard(
            "clipboard feature not enabled in this build".into(),
        ))
    }
}

/// Clipboard opened on first use and kept open afterwards, so earlier
/// copies stay available for as long as the session lives.
pub struct SessionClipboard<C, F> {
    open: F,
    inner: Option<C>,
}

impl<C, F> SessionClipboard<C, F>
where
    C: Clipboard,
    F: FnMut() -> Result<C>,
{
    pub fn new(open: F) -> Self {
        Self { open, inner: None }
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }
}

impl<C, F> Clipboard for SessionClipboard<C, F>
where
    C: Clipboard,
    F: FnMut() -> Result<C>,
{
    fn set_text(&mut self, text: &str) -> Result<()> {
        if self.inner.is_none() {
            self.inner = Some((self.open)()?);
        }
        match self.inner.as_mut() {
            Some(clipboard) => clipboard.set_text(text),
            None => Err(StampError::Clipboard("clipboard unavailable".into())),
        }
    }
}

/// Transient "copied" marker for one target of type `K`.
#[derive(Debug, Clone)]
pub struct CopyAck<K> {
    last: Option<(K, Instant)>,
}

impl<K> Default for CopyAck<K> {
    fn default() -> Self {
        Self { last: None }
    }
}

impl<K: PartialEq> CopyAck<K> {
    pub fn mark(&mut self, key: K, now: Instant) {
        self.last = Some((key, now));
    }

    pub fn is_active(&self, key: &K, now: Instant) -> bool {
        match &self.last {
            Some((k, at)) => k == key && now.saturating_duration_since(*at) < COPY_ACK,
            None => false,
        }
    }
}

/// Renders the latest result and tracks its copy acknowledgement.
#[derive(Debug, Default)]
pub struct ResultPresenter {
    ack: CopyAck<()>,
}

impl ResultPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn copy(&mut self, result: &GeneratedResult, clipboard: &mut dyn Clipboard) -> Result<()> {
        self.copy_at(result, clipboard, Instant::now())
    }

    pub fn copy_at(
        &mut self,
        result: &GeneratedResult,
        clipboard: &mut dyn Clipboard,
        now: Instant,
    ) -> Result<()> {
        clipboard.set_text(&result.prompt)?;
        self.ack.mark((), now);
        Ok(())
    }

    pub fn is_copied(&self) -> bool {
        self.is_copied_at(Instant::now())
    }

    pub fn is_copied_at(&self, now: Instant) -> bool {
        self.ack.is_active(&(), now)
    }

    pub fn render(&self, result: &GeneratedResult, colors: bool) -> String {
        self.render_at(result, colors, Instant::now())
    }

    pub fn render_at(&self, result: &GeneratedResult, colors: bool, now: Instant) -> String {
        let title = if self.is_copied_at(now) {
            "Generated prompt  ✔ Copied!"
        } else {
            "Generated prompt"
        };
        let tags = RESULT_TAGS
            .iter()
            .map(|t| format!("[{}]", t))
            .collect::<Vec<_>>()
            .join(" ");

        if colors {
            format!(
                "{}\n{}\n\n{}\n",
                title.bright_magenta().bold(),
                result.prompt,
                tags.bright_black()
            )
        } else {
            format!("{}\n{}\n\n{}\n", title, result.prompt, tags)
        }
    }
}

/// Renders the history list and tracks per-item copy acknowledgements.
#[derive(Debug, Default)]
pub struct HistoryPanel {
    ack: CopyAck<String>,
}

impl HistoryPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn copy(&mut self, item: &HistoryItem, clipboard: &mut dyn Clipboard) -> Result<()> {
        self.copy_at(item, clipboard, Instant::now())
    }

    pub fn copy_at(
        &mut self,
        item: &HistoryItem,
        clipboard: &mut dyn Clipboard,
        now: Instant,
    ) -> Result<()> {
        clipboard.set_text(&item.prompt)?;
        self.ack.mark(item.id.clone(), now);
        Ok(())
    }

    pub fn is_copied_at(&self, id: &str, now: Instant) -> bool {
        self.ack.is_active(&id.to_string(), now)
    }

    pub fn render(&self, items: &[HistoryItem], colors: bool) -> String {
        self.render_at(items, colors, Instant::now())
    }

    /// Empty string when there is nothing to show.
    pub fn render_at(&self, items: &[HistoryItem], colors: bool, now: Instant) -> String {
        if items.is_empty() {
            return String::new();
        }

        let mut out = String::from("Recent history\n");
        for (index, item) in items.iter().enumerate() {
            let date = item
                .timestamp
                .with_timezone(&Local)
                .format("%d/%m %H:%M")
                .to_string();
            let copied = if self.is_copied_at(&item.id, now) {
                "  ✔ copied"
            } else {
                ""
            };
            let fields = &item.form_data;
            let preview = prompt_preview(&item.prompt, 2);

            if colors {
                out.push_str(&format!(
                    "{} {}{}\n   {}\n   {} • {}\n",
                    format!("[{}]", index + 1).bright_black(),
                    date.bright_black(),
                    copied.green(),
                    fields.name.bold(),
                    fields.theme,
                    fields.effects
                ));
            } else {
                out.push_str(&format!(
                    "[{}] {}{}\n   {}\n   {} • {}\n",
                    index + 1,
                    date,
                    copied,
                    fields.name,
                    fields.theme,
                    fields.effects
                ));
            }
            for line in preview {
                out.push_str("   | ");
                out.push_str(&line);
                out.push('\n');
            }
        }
        out
    }
}

/// First `max_lines` non-empty lines, the last one marked when text was cut.
pub fn prompt_preview(prompt: &str, max_lines: usize) -> Vec<String> {
    let lines: Vec<&str> = prompt
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let mut preview: Vec<String> = lines.iter().take(max_lines).map(|l| l.to_string()).collect();
    if lines.len() > max_lines {
        if let Some(last) = preview.last_mut() {
            last.push_str(" …");
        }
    }
    preview
}
