//! Render-side projection of the message log: wrapped lines plus a scroll
//! window that sticks to the newest line unless the user scrolled away.

use monitor_feed::{LogEntry, Severity};

use crate::text::Typeface;

#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleLine {
    pub text: String,
    pub severity: Severity,
}

#[derive(Debug, Default)]
pub struct ConsoleLog {
    entries: Vec<LogEntry>,
    lines: Vec<ConsoleLine>,
    wrap_width: u32,
    font_px: f32,
    visible_lines: usize,
    scroll_offset: usize,
    scrolled_away: bool,
}

impl ConsoleLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Lines are wrapped immediately once a viewport is known.
    pub fn push(&mut self, entry: LogEntry, typeface: &Typeface) {
        if self.wrap_width > 0 {
            self.append_wrapped(&entry, typeface);
        }
        self.entries.push(entry);
        if !self.scrolled_away {
            self.scroll_offset = self.max_offset();
        }
    }

    /// Update the wrap width and window height. Re-wraps only when the
    /// width or font size changed.
    pub fn set_viewport(
        &mut self,
        typeface: &Typeface,
        wrap_width: u32,
        visible_lines: usize,
        font_px: f32,
    ) {
        let wrap_width = wrap_width.max(1);
        if wrap_width != self.wrap_width || font_px != self.font_px {
            self.wrap_width = wrap_width;
            self.font_px = font_px;
            self.lines.clear();
            let entries = std::mem::take(&mut self.entries);
            for entry in &entries {
                self.append_wrapped(entry, typeface);
            }
            self.entries = entries;
        }
        self.visible_lines = visible_lines;
        if self.scrolled_away {
            self.scroll_offset = self.scroll_offset.min(self.max_offset());
            self.scrolled_away = self.scroll_offset < self.max_offset();
        } else {
            self.scroll_offset = self.max_offset();
        }
    }

    fn append_wrapped(&mut self, entry: &LogEntry, typeface: &Typeface) {
        let text = entry.display_text();
        for line in typeface.wrap(&text, self.font_px, self.wrap_width) {
            self.lines.push(ConsoleLine {
                text: line,
                severity: entry.severity,
            });
        }
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn total_lines(&self) -> usize {
        self.lines.len()
    }

    pub fn visible_lines(&self) -> usize {
        self.visible_lines
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn max_offset(&self) -> usize {
        self.lines.len().saturating_sub(self.visible_lines)
    }

    pub fn is_overflowing(&self) -> bool {
        self.lines.len() > self.visible_lines
    }

    /// Scroll by whole lines; negative moves toward older lines. Ignored
    /// until the log overflows its window.
    pub fn scroll_lines(&mut self, delta: i32) {
        if !self.is_overflowing() {
            return;
        }
        let target = self.scroll_offset as i64 + delta as i64;
        self.scroll_offset = target.clamp(0, self.max_offset() as i64) as usize;
        self.scrolled_away = self.scroll_offset < self.max_offset();
    }

    pub fn window(&self) -> &[ConsoleLine] {
        let start = self.scroll_offset.min(self.lines.len());
        let end = (start + self.visible_lines).min(self.lines.len());
        &self.lines[start..end]
    }
}

#[cfg(test)]
mod console_log_tests {
    use super::*;

    fn entry(text: &str) -> LogEntry {
        LogEntry::new("LLM", text, Severity::System)
    }

    #[test]
    fn new_lines_keep_window_at_bottom() {
        let typeface = Typeface::fallback();
        let mut log = ConsoleLog::new();
        log.set_viewport(&typeface, 600, 3, 10.0);
        for index in 0..10 {
            log.push(entry(&format!("line {index}")), &typeface);
        }
        assert_eq!(log.total_lines(), 10);
        assert_eq!(log.scroll_offset(), 7);
        let window: Vec<_> = log.window().iter().map(|line| line.text.as_str()).collect();
        assert_eq!(window, vec!["LLM: line 7", "LLM: line 8", "LLM: line 9"]);
    }

    #[test]
    fn scrolling_up_pauses_auto_follow() {
        let typeface = Typeface::fallback();
        let mut log = ConsoleLog::new();
        log.set_viewport(&typeface, 600, 2, 10.0);
        for index in 0..5 {
            log.push(entry(&index.to_string()), &typeface);
        }
        log.scroll_lines(-2);
        assert_eq!(log.scroll_offset(), 1);
        log.push(entry("late"), &typeface);
        assert_eq!(log.scroll_offset(), 1);

        log.scroll_lines(100);
        assert_eq!(log.scroll_offset(), log.max_offset());
        log.push(entry("later"), &typeface);
        assert_eq!(log.scroll_offset(), log.max_offset());
    }

    #[test]
    fn scrolling_ignored_without_overflow() {
        let typeface = Typeface::fallback();
        let mut log = ConsoleLog::new();
        log.set_viewport(&typeface, 600, 5, 10.0);
        log.push(entry("only"), &typeface);
        log.scroll_lines(-3);
        assert_eq!(log.scroll_offset(), 0);
        assert!(!log.is_overflowing());
    }

    #[test]
    fn entries_pushed_before_layout_are_wrapped_later() {
        let typeface = Typeface::fallback();
        let mut log = ConsoleLog::new();
        log.push(entry("early"), &typeface);
        assert_eq!(log.total_lines(), 0);
        log.set_viewport(&typeface, 600, 4, 10.0);
        assert_eq!(log.total_lines(), 1);
        assert_eq!(log.entry_count(), 1);
    }

    #[test]
    fn narrowing_rewraps_and_clamps_offset() {
        let typeface = Typeface::fallback();
        let mut log = ConsoleLog::new();
        log.set_viewport(&typeface, 600, 2, 10.0);
        log.push(entry("one two three four five"), &typeface);
        assert_eq!(log.total_lines(), 1);
        log.set_viewport(&typeface, 60, 2, 10.0);
        assert!(log.total_lines() > 1);
        assert_eq!(log.scroll_offset(), log.max_offset());
    }
}
