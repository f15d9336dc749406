use super::{is_separator, EntityContext, Mode, RawTextKind, Tokenizer};
use crate::base::TextBuffer;
use crate::token::{Token, TokenSink};

impl RawTextKind {
    pub(super) fn name(self) -> &'static str {
        match self {
            RawTextKind::Script => "script",
            RawTextKind::Style => "style",
            RawTextKind::Textarea => "textarea",
            RawTextKind::Listing => "listing",
        }
    }

    // The closing sequence searched for in content, including the final `>`.
    fn end_marker(self) -> &'static str {
        match self {
            RawTextKind::Script => "</script>",
            RawTextKind::Style => "</style>",
            RawTextKind::Textarea => "</textarea>",
            RawTextKind::Listing => "</listing>",
        }
    }
}

const COMMENT_END: &str = "-->";

/// Raw-content scanner state: backs both raw-text elements and comments,
/// which share the tentative-marker search. `match_buf` keeps the original
/// casing of tentatively matched characters so a mismatch can flush them
/// back as literal content.
#[derive(Debug)]
pub(super) struct RawScanner {
    pub(super) content: TextBuffer,
    marker: &'static str,
    match_buf: TextBuffer,
    match_len: usize,
    // Best-effort "inside a string literal" heuristic for script content.
    quote: Option<char>,
}

impl RawScanner {
    pub(super) fn new() -> Self {
        RawScanner {
            content: TextBuffer::with_capacity(1024),
            marker: COMMENT_END,
            match_buf: TextBuffer::new(),
            match_len: 0,
            quote: None,
        }
    }

    pub(super) fn begin_raw(&mut self, kind: RawTextKind) {
        self.marker = kind.end_marker();
        self.reset_search();
    }

    pub(super) fn begin_comment(&mut self) {
        self.marker = COMMENT_END;
        self.reset_search();
    }

    fn reset_search(&mut self) {
        self.match_buf.clear();
        self.match_len = 0;
        self.quote = None;
    }

    fn expected(&self) -> Option<char> {
        self.marker[self.match_len..].chars().next()
    }

    // Tentative match failed: the buffered characters are ordinary content.
    fn flush_mismatch(&mut self) {
        self.content.push_str(self.match_buf.as_str());
        self.match_buf.clear();
        self.match_len = 0;
    }
}

impl<S: TokenSink> Tokenizer<S> {
    pub(super) fn tokenize_raw(&mut self, kind: RawTextKind) {
        while let Some(ch) = self.peek() {
            let expected = self.raw.expected();
            let quote_blocks = kind == RawTextKind::Script && self.raw.quote.is_some();

            if ch == '>' && expected == Some('>') && !quote_blocks {
                self.advance();
                self.finish_raw_element(kind);
                return;
            }

            if self.raw.match_len > 0 {
                if is_separator(ch) && expected == Some('>') {
                    // Tolerate `</script >`.
                    self.advance();
                } else if expected.is_some() && Some(ch.to_ascii_lowercase()) == expected {
                    self.raw.match_buf.push(ch);
                    self.raw.match_len += 1;
                    self.advance();
                } else {
                    self.raw.flush_mismatch();
                    // The mismatching character is reprocessed from the top.
                }
            } else if ch == '<' {
                self.raw.match_buf.push('<');
                self.raw.match_len = 1;
                self.advance();
            } else {
                if kind == RawTextKind::Script && self.options.track_script_quotes {
                    self.track_script_quote(ch);
                }

                if kind == RawTextKind::Textarea && ch == '&' {
                    self.advance();
                    self.start_entity(EntityContext::RawText(kind));
                    return;
                }

                self.raw.content.push(ch);
                self.advance();
            }
        }
    }

    // Known to be imprecise across multi-line constructs; the newline reset
    // bounds how far a stray quote can poison the end-tag search.
    fn track_script_quote(&mut self, ch: char) {
        match ch {
            '"' => {
                self.raw.quote = match self.raw.quote {
                    None => Some('"'),
                    Some('\'') => Some('\''),
                    Some(_) => None,
                }
            }
            '\'' => {
                self.raw.quote = match self.raw.quote {
                    None => Some('\''),
                    Some('"') => Some('"'),
                    Some(_) => None,
                }
            }
            '\r' | '\n' => {
                if self.raw.quote.is_some() {
                    self.raw.quote = None;
                }
            }
            _ => {}
        }
    }

    fn finish_raw_element(&mut self, kind: RawTextKind) {
        self.raw.reset_search();

        let content = self.raw.content.take();

        self.emit_raw_text(kind, &content);

        if let Some(id) = self.interner.tag_id(kind.name()) {
            self.emit(Token::EndTag { id });
        }

        self.mode = Mode::Text;
        trace!(@mode Mode::Text);

        if kind == RawTextKind::Script {
            self.script_gate(&content);
        }
    }

    /// Emits accumulated raw content as a single `Text` token. Also the
    /// end-of-input path for an element whose end tag never arrived.
    pub(super) fn emit_raw_text(&mut self, kind: RawTextKind, content: &str) {
        let text = match kind {
            RawTextKind::Textarea | RawTextKind::Listing => {
                normalize_preformatted(content, self.options.tab_width)
            }
            RawTextKind::Script | RawTextKind::Style => content.to_owned(),
        };

        if !text.is_empty() {
            self.emit(Token::Text(text));
        }
    }

    pub(super) fn tokenize_comment(&mut self) {
        while let Some(ch) = self.peek() {
            let expected = self.raw.expected();

            if ch == '>' && expected == Some('>') {
                self.advance();
                self.raw.reset_search();

                let content = self.raw.content.take();

                self.emit(Token::Comment(content));
                self.mode = Mode::Text;
                trace!(@mode Mode::Text);
                return;
            }

            if self.raw.match_len > 0 {
                if self.raw.match_len == 2 && ch == '-' {
                    // Broken HTML `--->`: the surplus dash is content.
                    self.raw.content.push('-');
                    self.advance();
                } else if self.raw.match_len == 2 && ch == '!' {
                    // Broken HTML `--!>`.
                    self.advance();
                } else if is_separator(ch) && expected == Some('>') {
                    self.advance();
                } else if expected.is_some() && Some(ch) == expected {
                    self.raw.match_buf.push(ch);
                    self.raw.match_len += 1;
                    self.advance();
                } else {
                    self.raw.flush_mismatch();
                }
            } else if ch == '-' {
                self.raw.match_buf.push('-');
                self.raw.match_len = 1;
                self.advance();
            } else {
                self.raw.content.push(ch);
                self.advance();
            }
        }
    }

    /// End-of-input salvage state: buffered content of a comment whose
    /// closing sequence never arrived. Partially matched marker characters
    /// are markup, not content, and are dropped.
    pub(super) fn take_unterminated_comment(&mut self) -> String {
        self.raw.match_buf.clear();
        self.raw.match_len = 0;

        self.raw.content.take()
    }

    /// Flushes a partially matched end marker back into raw content.
    pub(super) fn flush_partial_marker(&mut self) {
        self.raw.flush_mismatch();
    }
}

// Preformatted content policy for `textarea`/`listing`: CR and CRLF become
// LF, tabs expand to the next tab stop.
fn normalize_preformatted(content: &str, tab_width: usize) -> String {
    let tab_width = tab_width.max(1);
    let mut out = String::with_capacity(content.len());
    let mut column = 0;
    let mut skip_lf = false;

    for ch in content.chars() {
        if skip_lf {
            skip_lf = false;

            if ch == '\n' {
                continue;
            }
        }

        match ch {
            '\r' => {
                out.push('\n');
                column = 0;
                skip_lf = true;
            }
            '\n' => {
                out.push('\n');
                column = 0;
            }
            '\t' => {
                let fill = tab_width - (column % tab_width);

                for _ in 0..fill {
                    out.push(' ');
                }

                column += fill;
            }
            _ => {
                out.push(ch);
                column += 1;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabs_expand_to_tab_stops() {
        assert_eq!(normalize_preformatted("\tx", 8), "        x");
        assert_eq!(normalize_preformatted("ab\tx", 8), "ab      x");
        assert_eq!(normalize_preformatted("ab\tx", 4), "ab  x");
    }

    #[test]
    fn newlines_reset_the_column() {
        assert_eq!(normalize_preformatted("ab\n\tx", 4), "ab\n    x");
    }

    #[test]
    fn crlf_normalizes_to_lf() {
        assert_eq!(normalize_preformatted("a\r\nb\rc", 8), "a\nb\nc");
    }

    #[test]
    fn zero_tab_width_is_clamped() {
        assert_eq!(normalize_preformatted("\tx", 0), " x");
    }
}
