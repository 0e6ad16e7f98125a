//! Terminal rendering of the word cursor and status line.

use read_aloud_core::{Document, PlayState, RenderSink, Status};
use std::io::{self, Write};
use tracing::trace;

const PROGRESS_WIDTH: usize = 24;

pub struct TerminalRenderer {
    context_words: usize,
    last_line: Option<String>,
}

impl TerminalRenderer {
    pub fn new(context_words: usize) -> Self {
        Self {
            context_words,
            last_line: None,
        }
    }
}

impl RenderSink for TerminalRenderer {
    fn on_position_changed(&mut self, cursor: usize, state: PlayState, document: &Document) {
        let line = format!(
            "{:<8} {} {}/{}  {}",
            state_label(state),
            progress_bar(cursor, document.len(), PROGRESS_WIDTH),
            cursor.min(document.len()),
            document.len(),
            context_window(document, cursor, self.context_words),
        );
        if self.last_line.as_deref() == Some(line.as_str()) {
            return;
        }
        trace!(cursor, ?state, "Redrawing position line");
        let mut out = io::stdout().lock();
        let _ = write!(out, "\r\x1b[2K{line}");
        let _ = out.flush();
        self.last_line = Some(line);
    }

    fn on_status(&mut self, status: &Status) {
        let marker = if status.is_warning() { "!" } else { "*" };
        notice(&format!("{marker} {status}"));
        self.last_line = None;
    }
}

/// Print a message on its own line, clear of the position line.
pub fn notice(message: &str) {
    let mut out = io::stdout().lock();
    let _ = writeln!(out, "\r\x1b[2K{message}");
    let _ = out.flush();
}

fn state_label(state: PlayState) -> &'static str {
    match state {
        PlayState::Idle => "[idle]",
        PlayState::Playing => "[play]",
        PlayState::Paused => "[pause]",
        PlayState::Finished => "[done]",
    }
}

/// Words around the cursor, the current one bracketed.
pub fn context_window(document: &Document, cursor: usize, radius: usize) -> String {
    let len = document.len();
    if len == 0 {
        return String::new();
    }
    let from = cursor.saturating_sub(radius);
    let to = cursor.saturating_add(radius).saturating_add(1).min(len);
    let mut parts = Vec::with_capacity(to.saturating_sub(from) + 2);
    if from > 0 {
        parts.push("...".to_string());
    }
    for idx in from..to {
        let Some(word) = document.word(idx) else {
            continue;
        };
        if idx == cursor {
            parts.push(format!("[{word}]"));
        } else {
            parts.push(word.to_string());
        }
    }
    if to < len {
        parts.push("...".to_string());
    }
    parts.join(" ")
}

pub fn progress_bar(cursor: usize, len: usize, width: usize) -> String {
    let filled = if len == 0 {
        0
    } else {
        (cursor.min(len) * width) / len
    };
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}
