use super::{is_separator, Discard, EntityContext, Mode, RawTextKind, Tokenizer};
use crate::base::TextBuffer;
use crate::html::{AttrId, TagId};
use crate::token::{AttrName, Attribute, Token, TokenSink};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(super) enum TagScanState {
    TagName,
    SearchAttribute,
    AttributeName,
    SearchEqual,
    SearchValue,
    QuotedValue,
    Value,
    SearchEnd,
}

const COMMENT_START: [char; 4] = ['<', '!', '-', '-'];

/// Tag scanner state, persisted across chunk boundaries.
#[derive(Debug)]
pub(super) struct TagScanner {
    pub(super) state: TagScanState,
    // Matched length of `<!--`; starts at 1 (the `<` itself) when armed.
    pub(super) comment_prefix: usize,
    // Accumulates the tag name, then each attribute name in turn.
    name: String,
    tag_name: String,
    id: Option<TagId>,
    is_end: bool,
    attr_name: String,
    attr_id: Option<AttrId>,
    pub(super) value: TextBuffer,
    quote: char,
    attributes: Vec<Attribute>,
    // A separator was consumed since the last token character.
    pending_sep: bool,
    // `script` bookkeeping captured while its start tag is scanned.
    src_attr: Option<String>,
    language_attr: Option<String>,
    type_attr: Option<String>,
}

impl TagScanner {
    pub(super) fn new() -> Self {
        TagScanner {
            state: TagScanState::TagName,
            comment_prefix: 0,
            name: String::new(),
            tag_name: String::new(),
            id: None,
            is_end: false,
            attr_name: String::new(),
            attr_id: None,
            value: TextBuffer::new(),
            quote: '"',
            attributes: Vec::new(),
            pending_sep: false,
            src_attr: None,
            language_attr: None,
            type_attr: None,
        }
    }

    pub(super) fn reset(&mut self) {
        self.state = TagScanState::TagName;
        self.comment_prefix = 0;
        self.name.clear();
        self.tag_name.clear();
        self.id = None;
        self.is_end = false;
        self.attr_name.clear();
        self.attr_id = None;
        self.value.clear();
        self.attributes.clear();
        self.pending_sep = false;
        self.src_attr = None;
        self.language_attr = None;
        self.type_attr = None;
    }
}

impl<S: TokenSink> Tokenizer<S> {
    /// Flushes pending text and switches to tag scanning. The character
    /// after `<` has not been consumed; the scanner reads it as part of the
    /// (pseudo-)name. `comment_prefix` is 1 when the tag opened with `<!`.
    pub(super) fn start_tag_scan(&mut self, comment_prefix: usize) {
        self.add_pending();
        self.flush_text();
        self.tag.reset();
        self.tag.comment_prefix = comment_prefix;
        self.mode = Mode::Tag;
        trace!(@mode Mode::Tag);
    }

    pub(super) fn tokenize_tag(&mut self) {
        use TagScanState::*;

        while let Some(ch) = self.peek() {
            // Separator discarding between tag constructs.
            if is_separator(ch) {
                let discardable = match self.discard {
                    Discard::All => true,
                    Discard::Lf => ch == '\n' || ch == '\r',
                    Discard::None => false,
                };

                if discardable {
                    self.tag.pending_sep = true;
                    self.advance();
                    continue;
                }
            }

            match self.tag.state {
                TagName => {
                    if self.tag.comment_prefix > 0 {
                        if self.tag.comment_prefix < 4 && ch == COMMENT_START[self.tag.comment_prefix] {
                            self.tag.comment_prefix += 1;
                            self.advance();

                            if self.tag.comment_prefix == 4 {
                                // `<!--`: the pseudo-name is discarded and
                                // comment scanning takes over.
                                self.tag.reset();
                                self.raw.begin_comment();
                                self.mode = Mode::Comment;
                                trace!(@mode Mode::Comment);
                                return;
                            }

                            self.tag.name.push(ch.to_ascii_lowercase());
                            continue;
                        }

                        self.tag.comment_prefix = 0;
                    }

                    if !is_separator(ch) && ch != '>' {
                        self.tag.name.push(ch.to_ascii_lowercase());
                        self.advance();
                    } else {
                        self.finish_tag_name();
                    }
                }
                SearchAttribute => {
                    if ch == '>' {
                        self.tag.state = SearchEnd;
                    } else if self.tag.pending_sep && (ch == '\'' || ch == '"') {
                        // Scanner desync: a quote where an attribute name
                        // belongs is treated as a nameless value.
                        self.tag.attr_name.clear();
                        self.tag.attr_id = None;
                        self.tag.state = SearchValue;
                        self.tag.pending_sep = false;
                        self.discard = Discard::None;
                    } else {
                        self.tag.state = AttributeName;
                        self.tag.pending_sep = false;
                        self.discard = Discard::None;
                    }
                }
                AttributeName => {
                    if !is_separator(ch) && ch != '=' && ch != '>' {
                        self.tag.name.push(ch.to_ascii_lowercase());
                        self.advance();
                    } else {
                        self.finish_attr_name();
                    }
                }
                SearchEqual => {
                    if ch == '=' {
                        self.tag.state = SearchValue;
                        self.tag.pending_sep = false;
                        self.discard = Discard::All;
                        self.advance();
                    } else {
                        // No value: implicit empty string, and this
                        // character starts the next attribute.
                        self.push_attr();
                        self.tag.state = SearchAttribute;
                        self.discard = Discard::All;
                    }
                }
                SearchValue => {
                    if ch == '\'' || ch == '"' {
                        self.tag.quote = ch;
                        self.tag.state = QuotedValue;
                        self.discard = Discard::None;
                        self.advance();
                    } else {
                        self.tag.state = Value;
                        self.discard = Discard::All;
                    }

                    self.tag.pending_sep = false;
                }
                QuotedValue => {
                    if ch == '&' {
                        self.advance();
                        self.discard = Discard::None;
                        self.start_entity(EntityContext::Tag);
                        return;
                    }

                    if ch == self.tag.quote {
                        self.finish_quoted_value();
                        self.advance();
                    } else {
                        self.discard = Discard::None;
                        self.tag.value.push(ch);
                        self.advance();
                    }
                }
                Value => {
                    if ch == '&' {
                        self.advance();
                        self.start_entity(EntityContext::Tag);
                        return;
                    }

                    if self.tag.pending_sep || ch == '>' {
                        self.push_attr();
                        self.tag.state = SearchAttribute;
                        self.tag.pending_sep = false;
                        self.discard = Discard::All;
                    } else {
                        self.tag.value.push(ch);
                        self.advance();
                    }
                }
                SearchEnd => {
                    if ch != '>' {
                        // Desync recovery: swallow until the tag closes.
                        self.advance();
                        continue;
                    }

                    self.advance();
                    self.finish_tag();
                    return;
                }
            }
        }
    }

    fn finish_tag_name(&mut self) {
        let mut name = self.tag.name.as_str();
        let mut is_end = false;

        if name.starts_with('/') {
            is_end = true;
            name = &name[1..];
        }

        // Limited XHTML tolerance: `<br/>` drops the trailing slash.
        if name.len() > 1 && name.ends_with('/') {
            name = &name[..name.len() - 1];
        }

        self.tag.id = self.interner.tag_id(name);
        self.tag.is_end = is_end;
        self.tag.tag_name = name.to_owned();
        self.tag.name.clear();
        self.tag.state = TagScanState::SearchAttribute;
        self.discard = Discard::All;
    }

    fn finish_attr_name(&mut self) {
        let name = std::mem::take(&mut self.tag.name);

        // Attributes with a leading `!` are never interned.
        self.tag.attr_id = if !name.is_empty() && !name.starts_with('!') {
            self.interner.attr_id(&name)
        } else {
            None
        };
        self.tag.attr_name = name;
        self.tag.state = TagScanState::SearchEqual;
        self.discard = Discard::All;
    }

    fn finish_quoted_value(&mut self) {
        // Trailing spaces matter to some form fields, trailing newlines
        // never do.
        let mut value = self.tag.value.take();

        while value.ends_with('\n') || value.ends_with('\r') {
            value.pop();
        }

        self.push_attr_with(value);
        self.tag.state = TagScanState::SearchAttribute;
        self.tag.pending_sep = false;
        self.discard = Discard::All;
    }

    fn push_attr(&mut self) {
        let value = self.tag.value.take();

        self.push_attr_with(value);
    }

    fn push_attr_with(&mut self, value: String) {
        let attr_id = self.tag.attr_id.take();
        let attr_name = std::mem::take(&mut self.tag.attr_name);

        // The nameless-value desync case: syntax consumed, nothing kept.
        if attr_id.is_none() && attr_name.is_empty() {
            return;
        }

        if !self.tag.is_end && self.tag.tag_name == "script" {
            match attr_name.as_str() {
                "src" => capture_first(&mut self.tag.src_attr, &value),
                "language" => capture_first(&mut self.tag.language_attr, &value),
                "type" => capture_first(&mut self.tag.type_attr, &value),
                _ => {}
            }
        }

        let name = match attr_id {
            Some(id) => AttrName::Known(id),
            None => AttrName::Raw(attr_name),
        };

        // Repeated attribute names: first occurrence wins.
        if self.tag.attributes.iter().any(|attr| attr.name == name) {
            return;
        }

        self.tag.attributes.push(Attribute { name, value });
    }

    fn finish_tag(&mut self) {
        self.tag.comment_prefix = 0;
        self.tag.pending_sep = false;

        let Some(id) = self.tag.id else {
            // Unknown tag: syntax consumed, token dropped.
            self.discard = Discard::None;
            self.tag.reset();
            self.mode = Mode::Text;
            return;
        };

        let is_end = self.tag.is_end;
        let tag_name = std::mem::take(&mut self.tag.tag_name);

        let raw_kind = if is_end {
            None
        } else {
            match tag_name.as_str() {
                "script" => Some(RawTextKind::Script),
                "style" => Some(RawTextKind::Style),
                "textarea" => Some(RawTextKind::Textarea),
                "listing" => Some(RawTextKind::Listing),
                _ => None,
            }
        };

        // One newline after a begin tag is noise, after an end tag it is
        // content; preformatted contexts keep everything.
        if self.pre || tag_name == "pre" {
            self.discard = Discard::None;
        } else {
            self.discard = if is_end { Discard::None } else { Discard::Lf };
        }

        if raw_kind == Some(RawTextKind::Script) {
            self.script_src = self.tag.src_attr.take().filter(|src| !src.is_empty());
            self.script_executable = self.classifier.is_executable(
                self.tag.language_attr.as_deref(),
                self.tag.type_attr.as_deref(),
            );
        }

        let token = if is_end {
            Token::EndTag { id }
        } else {
            Token::StartTag {
                id,
                attributes: std::mem::take(&mut self.tag.attributes),
            }
        };

        self.emit(token);

        if tag_name == "pre" {
            self.pre = !is_end;
            self.pre_pos = 0;
        }

        self.tag.reset();

        match raw_kind {
            Some(kind) => {
                self.raw.begin_raw(kind);
                self.mode = Mode::RawText(kind);
                trace!(@mode Mode::RawText(kind));
            }
            None => {
                self.mode = Mode::Text;
            }
        }
    }
}

fn capture_first(slot: &mut Option<String>, value: &str) {
    if slot.is_none() {
        *slot = Some(value.to_owned());
    }
}
