use super::{EntityContext, Mode, Tokenizer};
use crate::html::entities;
use crate::token::TokenSink;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(super) enum EntityScanState {
    SearchEntity,
    NumericSearch,
    Hexadecimal,
    Decimal,
    EntityName,
    SearchSemicolon,
}

/// Entity decoder state, persisted across chunk boundaries.
///
/// `buf` holds the raw candidate text exactly as consumed (minus the leading
/// `&`), so a failed decode can reproduce the input verbatim.
#[derive(Debug)]
pub(super) struct EntityScanner {
    state: EntityScanState,
    buf: String,
    value: u32,
}

impl EntityScanner {
    pub(super) fn new() -> Self {
        EntityScanner {
            state: EntityScanState::SearchEntity,
            buf: String::new(),
            value: 0,
        }
    }

    pub(super) fn reset(&mut self) {
        self.state = EntityScanState::SearchEntity;
        self.buf.clear();
        self.value = 0;
    }
}

// Partial tolerance for MS Windows Latin-1 extensions: C1 control code
// points that pages written on Windows use for typographic characters.
fn fixup_windows_char(value: u32) -> u32 {
    match value {
        0x82 => ',' as u32,
        0x84 => '"' as u32,
        0x8b => '<' as u32,
        0x9b => '>' as u32,
        0x91 | 0x92 => '\'' as u32,
        0x93 | 0x94 => '"' as u32,
        0x95 => 0xb7,
        0x96 | 0x97 => '-' as u32,
        0x98 => '~' as u32,
        _ => value,
    }
}

impl<S: TokenSink> Tokenizer<S> {
    /// Arms the entity decoder. The `&` has already been consumed; `ctx`
    /// names the destination for decoded (or reproduced) text and the mode
    /// to return to.
    pub(super) fn start_entity(&mut self, ctx: EntityContext) {
        if matches!(ctx, EntityContext::Text) {
            self.discard = super::Discard::None;
            self.add_pending();
        }

        self.entity.reset();
        self.mode = Mode::Entity(ctx);
    }

    pub(super) fn tokenize_entity(&mut self, ctx: EntityContext) {
        use EntityScanState::*;

        while let Some(ch) = self.peek() {
            match self.entity.state {
                SearchEntity => {
                    if ch == '#' {
                        self.entity.buf.push('#');
                        self.advance();
                        self.entity.state = NumericSearch;
                    } else {
                        self.entity.state = EntityName;
                    }
                }
                NumericSearch => {
                    if ch == 'x' || ch == 'X' {
                        self.entity.buf.push(ch);
                        self.advance();
                        self.entity.state = Hexadecimal;
                    } else if ch.is_ascii_digit() {
                        self.entity.state = Decimal;
                    } else {
                        self.entity.state = SearchSemicolon;
                    }
                }
                Hexadecimal => {
                    if ch.is_ascii_hexdigit() {
                        let digit = ch.to_digit(16).unwrap_or(0);

                        self.entity.value =
                            self.entity.value.saturating_mul(16).saturating_add(digit);
                        self.entity.buf.push(ch);
                        self.advance();
                    } else {
                        self.entity.state = SearchSemicolon;
                    }
                }
                Decimal => {
                    if ch.is_ascii_digit() {
                        let digit = ch.to_digit(10).unwrap_or(0);

                        self.entity.value =
                            self.entity.value.saturating_mul(10).saturating_add(digit);
                        self.entity.buf.push(ch);
                        self.advance();
                    } else {
                        self.entity.state = SearchSemicolon;
                    }
                }
                EntityName => {
                    if ch.is_ascii_alphanumeric() && self.entity.buf.len() < entities::MAX_NAME_LEN
                    {
                        self.entity.buf.push(ch);
                        self.advance();
                    } else {
                        self.entity.state = SearchSemicolon;
                    }
                }
                SearchSemicolon => {
                    self.finish_entity(ctx, Some(ch));
                    return;
                }
            }
        }
    }

    /// Resolves the accumulated candidate. `next` is the terminating
    /// character still in the input, or `None` at end of input.
    pub(super) fn finish_entity(&mut self, ctx: EntityContext, next: Option<char>) {
        let in_tag = matches!(ctx, EntityContext::Tag);
        let buf = std::mem::take(&mut self.entity.buf);

        let resolved: Option<(String, usize)> = if let Some(digits) = numeric_digits(&buf) {
            if digits.is_empty() {
                None
            } else {
                char::from_u32(fixup_windows_char(self.entity.value))
                    .filter(|&ch| ch != '\0')
                    .map(|ch| (ch.to_string(), buf.len()))
            }
        } else if buf.len() >= 2 {
            entities::longest_prefix(&buf).map(|(len, decoded)| (decoded.to_owned(), len))
        } else {
            None
        };

        match resolved {
            // Inside a tag an entity with a missing `;` stays untranslated
            // so attribute syntax (`?a=1&b=2`) survives intact.
            Some((decoded, matched_len))
                if !in_tag || (matched_len == buf.len() && next == Some(';')) =>
            {
                self.entity_dest_push(ctx, &decoded);

                if matched_len < buf.len() {
                    // Longest-prefix match: the leftover characters are
                    // ordinary text and the `;` (if any) is not ours.
                    let leftover = buf[matched_len..].to_owned();

                    self.entity_dest_push(ctx, &leftover);
                } else if next == Some(';') {
                    self.advance();
                }
            }
            _ => {
                // No valid entity: reproduce the ampersand and everything
                // consumed after it.
                self.entity_dest_push(ctx, "&");
                self.entity_dest_push(ctx, &buf);
            }
        }

        self.entity.reset();
        self.mode = match ctx {
            EntityContext::Text => Mode::Text,
            EntityContext::Tag => Mode::Tag,
            EntityContext::RawText(kind) => Mode::RawText(kind),
        };
    }

    fn entity_dest_push(&mut self, ctx: EntityContext, text: &str) {
        match ctx {
            EntityContext::Text => {
                self.text.push_str(text);

                if self.pre {
                    self.pre_pos += text.chars().count();
                }
            }
            EntityContext::Tag => self.tag.value.push_str(text),
            EntityContext::RawText(_) => self.raw.content.push_str(text),
        }
    }
}

// For a numeric candidate, the digit run after the `#` / `#x` prefix.
fn numeric_digits(buf: &str) -> Option<&str> {
    let rest = buf.strip_prefix('#')?;

    Some(
        rest.strip_prefix(['x', 'X'])
            .unwrap_or(rest),
    )
}
