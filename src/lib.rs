//! Streaming tokenizer for legacy ("tag soup") HTML.
//!
//! `tagsoup` converts arbitrarily chunked markup text into a sequence of
//! structured tokens (start tags, end tags, text runs and comments) for a
//! separate tree-building parser, without ever holding the whole document in
//! memory. It keeps the tolerance model of the pre-HTML5 era: malformed
//! input never aborts tokenization, it just degrades to literal text.
//!
//! The interesting parts:
//!
//! - SGML entity references (`&name;`, `&#NN;`, `&#xHH;`) decode inline,
//!   including ambiguous and unterminated forms.
//! - Raw-text elements (`script`, `style`, `textarea`, `listing`) are
//!   scanned only for their case-insensitive end tag.
//! - The tokenizer is reentrant around script execution: markup written by
//!   a synchronously executing script is buffered and tokenized in order,
//!   and an external script reference suspends tokenization entirely until
//!   the host reports the fetch complete.
//!
//! ```
//! use tagsoup::{Token, Tokenizer};
//!
//! let sink: Vec<Token> = Vec::new();
//! let mut tokenizer = Tokenizer::new(sink);
//!
//! tokenizer.feed("<b>hi");
//! tokenizer.feed("</b>");
//! tokenizer.finish();
//!
//! let tokens = tokenizer.into_sink();
//! assert_eq!(tokens.len(), 3);
//! ```

#[macro_use]
mod debug_trace;

mod base;
mod errors;
mod html;
mod token;
mod tokenizer;

pub use self::errors::TokenizerError;
pub use self::html::{attr_name, tag_name, AttrId, DefaultInterner, NameInterner, TagId};
pub use self::token::{AttrName, Attribute, Token, TokenSink};
pub use self::tokenizer::{
    EcmaScriptClassifier, ScriptEngine, ScriptFetchRequest, ScriptLoader, ScriptOutput,
    ScriptTypeClassifier, Tokenizer, TokenizerOptions,
};
