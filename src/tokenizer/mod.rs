mod entity;
mod raw;
mod script;
mod tag;

pub use self::script::{
    EcmaScriptClassifier, ScriptEngine, ScriptFetchRequest, ScriptLoader, ScriptOutput,
    ScriptTypeClassifier,
};

use self::entity::EntityScanner;
use self::raw::RawScanner;
use self::tag::TagScanner;
use crate::base::TextBuffer;
use crate::html::{DefaultInterner, NameInterner};
use crate::token::{Token, TokenSink};
use bitflags::bitflags;
use cfg_if::cfg_if;
use memchr::memchr;

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    struct Flags: u8 {
        // Reentrancy guard: a script is executing synchronously; anything
        // written lands in the script-output buffer.
        const EXECUTING_SCRIPT = 1;
        // Host-driven pause.
        const ON_HOLD = 1 << 1;
        // Suspended awaiting an external script fetch; new input queues.
        const LOADING_EXTERNAL_SCRIPT = 1 << 2;
        // `finish` has been called; no more input will ever arrive.
        const NO_MORE_DATA = 1 << 3;
        // A CR was consumed; a directly following LF is part of it.
        const SKIP_LF = 1 << 4;
        // The final flush has run.
        const FINISHED = 1 << 5;
    }
}

/// Major state of the tokenizer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Mode {
    Text,
    TagOpen,
    Tag,
    Comment,
    ProcessingInstruction,
    RawText(RawTextKind),
    Entity(EntityContext),
}

/// Elements whose content is never markup; only the matching end tag is
/// searched for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum RawTextKind {
    Script,
    Style,
    Textarea,
    Listing,
}

/// Where entity output goes and where scanning resumes afterwards.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum EntityContext {
    Text,
    Tag,
    RawText(RawTextKind),
}

cfg_if! {
    if #[cfg(feature = "debug_trace")] {
        use std::fmt;

        impl fmt::Display for Mode {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    Mode::Text => f.write_str("text"),
                    Mode::TagOpen => f.write_str("tag open"),
                    Mode::Tag => f.write_str("tag"),
                    Mode::Comment => f.write_str("comment"),
                    Mode::ProcessingInstruction => f.write_str("processing instruction"),
                    Mode::RawText(kind) => write!(f, "raw text ({})", kind.name()),
                    Mode::Entity(_) => f.write_str("entity"),
                }
            }
        }
    }
}

// One whitespace character held back until the next construct decides its
// fate (committed literally, expanded to a tab stop, or discarded).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Pending {
    Space,
    Tab,
    Lf,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Discard {
    None,
    Lf,
    All,
}

pub(crate) fn is_separator(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r')
}

/// Tokenizer configuration.
#[derive(Debug, Clone)]
pub struct TokenizerOptions {
    /// Tab stop width used when expanding tabs inside preformatted
    /// (`textarea`/`listing`) content and when tracking the `pre` column.
    pub tab_width: usize,
    /// Track `'`/`"` string literals inside `script` content so a `>`
    /// inside a string is not mistaken for the end tag. Best-effort.
    pub track_script_quotes: bool,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        TokenizerOptions {
            tab_width: 8,
            track_script_quotes: true,
        }
    }
}

/// Incremental tokenizer for legacy HTML.
///
/// Input arrives in arbitrarily split chunks through [`feed`](Self::feed);
/// completed tokens go to the [`TokenSink`] one at a time, in input order.
/// Malformed markup never fails: unknown names are dropped silently,
/// unresolved entities reproduce themselves literally and an unterminated
/// comment is salvaged at [`finish`](Self::finish).
///
/// A `script` element may execute synchronously mid-stream and write more
/// markup back into the document, or suspend the whole tokenizer while an
/// external source is fetched; see [`ScriptEngine`], [`ScriptLoader`] and
/// [`on_external_script_loaded`](Self::on_external_script_loaded).
pub struct Tokenizer<S: TokenSink> {
    sink: S,
    options: TokenizerOptions,
    interner: Box<dyn NameInterner>,
    classifier: Box<dyn ScriptTypeClassifier>,
    engine: Option<Box<dyn ScriptEngine>>,
    loader: Option<Box<dyn ScriptLoader>>,

    flags: Flags,
    mode: Mode,

    // Input currently being dispatched.
    src: Vec<char>,
    pos: usize,

    // Text accumulation and whitespace bookkeeping.
    text: TextBuffer,
    pending: Option<Pending>,
    discard: Discard,
    pre: bool,
    pre_pos: usize,

    // Sub-scanner state, persisted across chunk boundaries.
    tag: TagScanner,
    raw: RawScanner,
    entity: EntityScanner,
    pi_question: bool,

    // Script gate.
    script_output: String,
    pending_src: String,
    script_src: Option<String>,
    script_executable: bool,
    pending_fetch: Option<u64>,
    fetch_seq: u64,
}

impl<S: TokenSink> Tokenizer<S> {
    pub fn new(sink: S) -> Self {
        Self::with_options(sink, TokenizerOptions::default())
    }

    pub fn with_options(sink: S, options: TokenizerOptions) -> Self {
        Tokenizer {
            sink,
            options,
            interner: Box::new(DefaultInterner),
            classifier: Box::new(EcmaScriptClassifier),
            engine: None,
            loader: None,
            flags: Flags::empty(),
            mode: Mode::Text,
            src: Vec::new(),
            pos: 0,
            text: TextBuffer::new(),
            pending: None,
            discard: Discard::None,
            pre: false,
            pre_pos: 0,
            tag: TagScanner::new(),
            raw: RawScanner::new(),
            entity: EntityScanner::new(),
            pi_question: false,
            script_output: String::new(),
            pending_src: String::new(),
            script_src: None,
            script_executable: true,
            pending_fetch: None,
            fetch_seq: 0,
        }
    }

    pub fn set_script_engine(&mut self, engine: Box<dyn ScriptEngine>) {
        self.engine = Some(engine);
    }

    pub fn set_script_loader(&mut self, loader: Box<dyn ScriptLoader>) {
        self.loader = Some(loader);
    }

    pub fn set_script_type_classifier(&mut self, classifier: Box<dyn ScriptTypeClassifier>) {
        self.classifier = classifier;
    }

    pub fn set_name_interner(&mut self, interner: Box<dyn NameInterner>) {
        self.interner = interner;
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// True while the tokenizer awaits [`on_external_script_loaded`]
    /// (Self::on_external_script_loaded).
    pub fn is_suspended(&self) -> bool {
        self.flags.contains(Flags::LOADING_EXTERNAL_SCRIPT)
    }

    /// Accepts the next run of characters. The chunk may split any
    /// construct at any boundary.
    pub fn feed(&mut self, chunk: &str) {
        self.write(chunk);
        self.maybe_end();
    }

    /// Externally pauses (`true`) or resumes (`false`) processing without
    /// losing buffered state. Input fed while held is replayed on release.
    pub fn set_hold(&mut self, hold: bool) {
        if self.flags.contains(Flags::ON_HOLD) == hold {
            return;
        }

        self.flags.set(Flags::ON_HOLD, hold);

        if !hold {
            let mut rest = std::mem::take(&mut self.script_output);

            rest.push_str(&self.pending_src);
            self.pending_src.clear();
            self.write(&rest);
            self.maybe_end();
        }
    }

    /// Signals that no more input will ever arrive.
    ///
    /// Unterminated-comment salvage runs first: the buffered comment is cut
    /// at the first literal `>` and the remainder re-fed as ordinary text,
    /// repeatedly, so a missing `-->` cannot swallow the rest of the
    /// document. If the tokenizer is suspended, the final flush is deferred
    /// until resumption. Calling `finish` twice emits nothing the second
    /// time.
    pub fn finish(&mut self) {
        while matches!(self.mode, Mode::Comment) {
            let content = self.take_unterminated_comment();

            if content.is_empty() {
                break;
            }

            self.mode = Mode::Text;

            let food = match memchr(b'>', content.as_bytes()) {
                Some(pos) => content[pos + 1..].to_owned(),
                None => content,
            };

            self.write(&food);
        }

        self.flags.insert(Flags::NO_MORE_DATA);
        self.maybe_end();
    }

    // The reentrant entry point. Routing happens here: writes made during
    // script execution or a hold accumulate as script output, writes made
    // while an external fetch is outstanding queue as pending input, and
    // everything else is dispatched immediately.
    pub(crate) fn write(&mut self, input: &str) {
        if self.flags.contains(Flags::FINISHED) || input.is_empty() {
            return;
        }

        if self
            .flags
            .intersects(Flags::EXECUTING_SCRIPT | Flags::ON_HOLD)
        {
            self.script_output.push_str(input);
            return;
        }

        if self.flags.contains(Flags::LOADING_EXTERNAL_SCRIPT) {
            self.pending_src.push_str(input);
            return;
        }

        self.src = input.chars().collect();
        self.pos = 0;
        self.process();
    }

    fn process(&mut self) {
        while self.pos < self.src.len() {
            if self.flags.contains(Flags::LOADING_EXTERNAL_SCRIPT) {
                break;
            }

            match self.mode {
                Mode::Text => self.tokenize_text(),
                Mode::TagOpen => self.tokenize_tag_open(),
                Mode::Tag => self.tokenize_tag(),
                Mode::Comment => self.tokenize_comment(),
                Mode::ProcessingInstruction => self.tokenize_pi(),
                Mode::RawText(kind) => self.tokenize_raw(kind),
                Mode::Entity(ctx) => self.tokenize_entity(ctx),
            }
        }

        self.src.clear();
        self.pos = 0;
    }

    fn tokenize_text(&mut self) {
        while let Some(ch) = self.peek() {
            if self.flags.contains(Flags::SKIP_LF) {
                self.flags.remove(Flags::SKIP_LF);

                if ch == '\n' {
                    self.advance();
                    continue;
                }
            }

            match ch {
                '&' => {
                    self.advance();
                    self.start_entity(EntityContext::Text);
                    return;
                }
                '<' => {
                    self.advance();
                    self.discard = Discard::None;
                    self.mode = Mode::TagOpen;
                    return;
                }
                '\n' | '\r' => {
                    match self.discard {
                        Discard::Lf => self.discard = Discard::None,
                        Discard::All => {}
                        Discard::None => {
                            self.add_pending();
                            self.pending = Some(Pending::Lf);
                        }
                    }

                    if ch == '\r' {
                        self.flags.insert(Flags::SKIP_LF);
                    }

                    self.advance();
                }
                ' ' | '\t' => {
                    if self.discard != Discard::All {
                        self.add_pending();
                        self.pending = Some(if ch == ' ' { Pending::Space } else { Pending::Tab });
                    }

                    self.advance();
                }
                _ => {
                    self.add_pending();
                    self.discard = Discard::None;

                    if self.pre {
                        self.pre_pos += 1;
                    }

                    self.text.push(ch);
                    self.advance();
                }
            }
        }
    }

    // One character of lookahead after `<` decides between an end tag, a
    // comment candidate, a processing instruction, a start tag, and plain
    // text that merely contained a `<`.
    fn tokenize_tag_open(&mut self) {
        let Some(ch) = self.peek() else {
            return;
        };

        match ch {
            '/' => {
                // A newline directly before `</` is not content.
                if !self.pre && self.pending == Some(Pending::Lf) {
                    self.pending = None;
                }

                self.start_tag_scan(0);
            }
            '!' => {
                self.start_tag_scan(1);
            }
            '?' => {
                self.pi_question = false;
                self.mode = Mode::ProcessingInstruction;
            }
            _ if ch.is_ascii_alphabetic() => {
                self.start_tag_scan(0);
            }
            _ => {
                self.add_pending();
                self.text.push('<');
                self.text.push(ch);
                self.advance();
                self.mode = Mode::Text;
            }
        }
    }

    // `<?` ... `?>`: consumed, no token.
    fn tokenize_pi(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '?' {
                self.pi_question = true;
            } else if self.pi_question && ch == '>' {
                self.pi_question = false;
                self.discard = Discard::Lf;
                self.mode = Mode::Text;
                self.advance();
                return;
            } else {
                self.pi_question = false;
            }

            self.advance();
        }
    }

    fn add_pending(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        match pending {
            Pending::Space => {
                self.text.push(' ');

                if self.pre {
                    self.pre_pos += 1;
                }
            }
            Pending::Lf => {
                self.text.push('\n');
                self.pre_pos = 0;
            }
            Pending::Tab => {
                if self.pre {
                    let tab_width = self.options.tab_width.max(1);
                    let fill = tab_width - (self.pre_pos % tab_width);

                    for _ in 0..fill {
                        self.text.push(' ');
                    }

                    self.pre_pos += fill;
                } else {
                    self.text.push('\t');
                }
            }
        }
    }

    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            let text = self.text.take();

            self.emit(Token::Text(text));
        }
    }

    fn emit(&mut self, token: Token) {
        trace!(@token &token);
        self.sink.handle_token(token);
    }

    fn maybe_end(&mut self) {
        if self.flags.contains(Flags::NO_MORE_DATA)
            && !self.flags.intersects(
                Flags::LOADING_EXTERNAL_SCRIPT | Flags::EXECUTING_SCRIPT | Flags::ON_HOLD,
            )
        {
            self.end_flush();
        }
    }

    // Best-effort final flush: whatever is mid-flight is reproduced as text
    // where it can be, dropped where it cannot (half-scanned tags and
    // processing instructions).
    fn end_flush(&mut self) {
        if self.flags.contains(Flags::FINISHED) {
            return;
        }

        if let Mode::Entity(ctx) = self.mode {
            self.finish_entity(ctx, None);
        }

        match self.mode {
            Mode::TagOpen => {
                self.add_pending();
                self.text.push('<');
            }
            Mode::RawText(kind) => {
                self.flush_partial_marker();

                let content = self.raw.content.take();

                self.emit_raw_text(kind, &content);
            }
            Mode::Comment => {
                // Salvage already ran; an empty comment body is dropped.
                let _ = self.take_unterminated_comment();
            }
            _ => {}
        }

        self.mode = Mode::Text;
        self.add_pending();
        self.flush_text();
        self.flags.insert(Flags::FINISHED);
    }

    #[inline]
    fn peek(&self) -> Option<char> {
        self.src.get(self.pos).copied()
    }

    #[inline]
    fn advance(&mut self) {
        self.pos += 1;
    }
}
