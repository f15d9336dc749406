use std::cell::RefCell;
use std::rc::Rc;

use tagsoup::{
    AttrId, AttrName, Attribute, DefaultInterner, NameInterner, ScriptEngine,
    ScriptFetchRequest, ScriptLoader, ScriptOutput, TagId, Token, Tokenizer, TokenizerError,
    TokenizerOptions,
};

fn tokenize(input: &str) -> Vec<Token> {
    let mut tokenizer = Tokenizer::new(Vec::<Token>::new());

    tokenizer.feed(input);
    tokenizer.finish();

    tokenizer.into_sink()
}

fn tokenize_chunked(input: &str) -> Vec<Token> {
    let mut tokenizer = Tokenizer::new(Vec::<Token>::new());

    for ch in input.chars() {
        tokenizer.feed(&ch.to_string());
    }

    tokenizer.finish();

    tokenizer.into_sink()
}

fn tag_id(name: &str) -> TagId {
    DefaultInterner
        .tag_id(name)
        .unwrap_or_else(|| panic!("tag `{name}` should be in the built-in table"))
}

fn start(name: &str) -> Token {
    Token::StartTag {
        id: tag_id(name),
        attributes: vec![],
    }
}

fn start_with(name: &str, attributes: Vec<Attribute>) -> Token {
    Token::StartTag {
        id: tag_id(name),
        attributes,
    }
}

fn end(name: &str) -> Token {
    Token::EndTag { id: tag_id(name) }
}

fn text(content: &str) -> Token {
    Token::Text(content.to_owned())
}

fn attr(name: &str, value: &str) -> Attribute {
    let key = match DefaultInterner.attr_id(name) {
        Some(id) => AttrName::Known(id),
        None => AttrName::Raw(name.to_owned()),
    };

    Attribute {
        name: key,
        value: value.to_owned(),
    }
}

// Toy engine: understands exactly one statement form, `doc.write('...')`.
struct DocWriteEngine;

impl ScriptEngine for DocWriteEngine {
    fn execute(&mut self, source: &str, doc: &mut ScriptOutput<'_>) {
        if let Some(inner) = source
            .trim()
            .strip_prefix("doc.write('")
            .and_then(|rest| rest.strip_suffix("')"))
        {
            doc.write(inner);
        }
    }
}

#[derive(Clone, Default)]
struct RecordingLoader {
    requests: Rc<RefCell<Vec<ScriptFetchRequest>>>,
}

impl ScriptLoader for RecordingLoader {
    fn request(&mut self, request: &ScriptFetchRequest) {
        self.requests.borrow_mut().push(request.clone());
    }
}

#[test]
fn plain_text_passes_through_unchanged() {
    let input = "hello world";

    assert_eq!(tokenize(input), [text(input)]);

    let with_whitespace = "a b\tc\nd  e\n";

    assert_eq!(tokenize(with_whitespace), [text(with_whitespace)]);
}

#[test]
fn cr_and_crlf_normalize_to_lf() {
    assert_eq!(tokenize("a\r\nb"), [text("a\nb")]);
    assert_eq!(tokenize("a\rb"), [text("a\nb")]);
}

#[test]
fn basic_entities_decode() {
    assert_eq!(tokenize("&amp;"), [text("&")]);
    assert_eq!(tokenize("&#65;"), [text("A")]);
    assert_eq!(tokenize("&#x41;"), [text("A")]);
}

#[test]
fn unknown_entity_reproduces_literally() {
    assert_eq!(tokenize("&unknownentity;"), [text("&unknownentity;")]);
}

#[test]
fn named_entity_semicolon_is_optional_in_text() {
    assert_eq!(tokenize("x &amp y"), [text("x & y")]);
}

#[test]
fn entity_prefix_match_keeps_the_leftover() {
    // `ampx` resolves to `amp`; `x` and the `;` are ordinary text.
    assert_eq!(tokenize("&ampx;"), [text("&x;")]);
}

#[test]
fn lone_ampersand_is_text() {
    assert_eq!(tokenize("a & b"), [text("a & b")]);
}

#[test]
fn invalid_code_point_reproduces_literally() {
    assert_eq!(tokenize("&#xD800;"), [text("&#xD800;")]);
    assert_eq!(tokenize("&#0;"), [text("&#0;")]);
}

#[test]
fn windows_1252_code_points_are_fixed_up() {
    assert_eq!(tokenize("&#147;q&#148;"), [text("\"q\"")]);
    assert_eq!(tokenize("&#150;"), [text("-")]);
}

#[test]
fn simple_tag_sequence() {
    assert_eq!(
        tokenize("<b>hi</b>"),
        [start("b"), text("hi"), end("b")]
    );
}

#[test]
fn unknown_tag_is_consumed_silently() {
    assert_eq!(tokenize(r#"<foo bar="1">text</foo>"#), [text("text")]);
}

#[test]
fn doctype_is_consumed_silently() {
    assert_eq!(
        tokenize("<!DOCTYPE html><b>x</b>"),
        [start("b"), text("x"), end("b")]
    );
}

#[test]
fn attributes_quoted_unquoted_and_bare() {
    assert_eq!(
        tokenize(r#"<a href="x" target=top checked>"#),
        [start_with(
            "a",
            vec![attr("href", "x"), attr("target", "top"), attr("checked", "")]
        )]
    );
}

#[test]
fn attribute_names_are_lowercased() {
    assert_eq!(
        tokenize(r#"<a HREF="x">"#),
        [start_with("a", vec![attr("href", "x")])]
    );
}

#[test]
fn unknown_attribute_names_keep_their_raw_key() {
    assert_eq!(
        tokenize(r#"<a data-x="1">"#),
        [start_with("a", vec![attr("data-x", "1")])]
    );
}

#[test]
fn duplicate_attributes_first_wins() {
    assert_eq!(
        tokenize(r#"<a href="1" href="2">"#),
        [start_with("a", vec![attr("href", "1")])]
    );
}

#[test]
fn nameless_value_is_consumed_and_dropped() {
    assert_eq!(tokenize(r#"<a "v">"#), [start_with("a", vec![])]);
    assert_eq!(tokenize(r#"<a ="v">"#), [start_with("a", vec![])]);
}

#[test]
fn self_closing_tag_emits_no_end_tag() {
    assert_eq!(tokenize("<br/>x"), [start("br"), text("x")]);
}

#[test]
fn entities_decode_inside_attribute_values() {
    assert_eq!(
        tokenize(r#"<a href="a&amp;b">"#),
        [start_with("a", vec![attr("href", "a&b")])]
    );
}

#[test]
fn entity_without_semicolon_is_invalid_inside_a_tag() {
    // Query strings survive: `&b` is not an entity here.
    assert_eq!(
        tokenize(r#"<a href="x?a=1&b=2">"#),
        [start_with("a", vec![attr("href", "x?a=1&b=2")])]
    );
    assert_eq!(
        tokenize(r#"<a href="a&ampb">"#),
        [start_with("a", vec![attr("href", "a&ampb")])]
    );
}

#[test]
fn quoted_value_trailing_newlines_are_trimmed() {
    assert_eq!(
        tokenize("<a href=\"x\n\">"),
        [start_with("a", vec![attr("href", "x")])]
    );
}

#[test]
fn invalid_tag_open_is_literal_text() {
    assert_eq!(tokenize("a<1b"), [text("a<1b")]);
}

#[test]
fn comment_token_carries_its_content() {
    assert_eq!(tokenize("<!-- c -->"), [Token::Comment(" c ".to_owned())]);
}

#[test]
fn comment_end_tolerances() {
    // `--->`: the surplus dash is content.
    assert_eq!(tokenize("<!--a--->"), [Token::Comment("a-".to_owned())]);
    // `--!>` closes.
    assert_eq!(tokenize("<!--b--!>"), [Token::Comment("b".to_owned())]);
    // Whitespace may precede the final `>`.
    assert_eq!(tokenize("<!--c-- >"), [Token::Comment("c".to_owned())]);
}

#[test]
fn dashes_inside_comment_content_are_kept() {
    assert_eq!(tokenize("<!--a--b-->"), [Token::Comment("a--b".to_owned())]);
}

#[test]
fn unterminated_comment_is_salvaged_at_finish() {
    // Everything up to and including the first `>` is discarded, the rest
    // re-feeds as ordinary text.
    assert_eq!(tokenize("<!--x>tail"), [text("tail")]);

    // Without any `>` the buffered content itself is re-fed.
    assert_eq!(tokenize("<!--abc"), [text("abc")]);
}

#[test]
fn processing_instruction_is_consumed() {
    assert_eq!(tokenize("a<?php echo ?>b"), [text("ab")]);
}

#[test]
fn newline_after_processing_instruction_is_suppressed() {
    assert_eq!(tokenize("a<?p?>\nb"), [text("ab")]);
}

#[test]
fn newline_after_begin_tag_is_suppressed() {
    assert_eq!(tokenize("<b>\nhi</b>"), [start("b"), text("hi"), end("b")]);
}

#[test]
fn newline_before_end_tag_is_suppressed() {
    assert_eq!(tokenize("<b>hi\n</b>"), [start("b"), text("hi"), end("b")]);
}

#[test]
fn newline_after_end_tag_is_content() {
    assert_eq!(
        tokenize("<b>x</b>\ny"),
        [start("b"), text("x"), end("b"), text("\ny")]
    );
}

#[test]
fn pre_keeps_leading_newline_and_expands_tabs() {
    let mut tokenizer = Tokenizer::with_options(
        Vec::<Token>::new(),
        TokenizerOptions {
            tab_width: 4,
            ..TokenizerOptions::default()
        },
    );

    tokenizer.feed("<pre>\na\tb</pre>");
    tokenizer.finish();

    assert_eq!(
        tokenizer.into_sink(),
        [start("pre"), text("\na   b"), end("pre")]
    );
}

#[test]
fn script_content_is_raw_and_quote_tracking_guards_the_end_tag() {
    assert_eq!(
        tokenize("<SCRIPT>x='<b>';</SCRIPT>more"),
        [
            start("script"),
            text("x='<b>';"),
            end("script"),
            text("more")
        ]
    );
}

#[test]
fn quote_tracking_shields_an_embedded_end_tag() {
    let tokens = tokenize("<script>x='</script>';</script>y");

    assert_eq!(
        tokens,
        [
            start("script"),
            text("x='</script>';"),
            end("script"),
            text("y")
        ]
    );
}

#[test]
fn quote_tracking_can_be_disabled() {
    let mut tokenizer = Tokenizer::with_options(
        Vec::<Token>::new(),
        TokenizerOptions {
            track_script_quotes: false,
            ..TokenizerOptions::default()
        },
    );

    tokenizer.feed("<script>x='</script>';</script>y");
    tokenizer.finish();

    // Without the heuristic, the embedded end tag closes the element and
    // the leftovers tokenize as markup.
    assert_eq!(
        tokenizer.into_sink(),
        [
            start("script"),
            text("x='"),
            end("script"),
            text("';"),
            end("script"),
            text("y")
        ]
    );
}

#[test]
fn end_tag_may_have_spaces_before_the_closing_bracket() {
    assert_eq!(
        tokenize("<script>x</script >y"),
        [start("script"), text("x"), end("script"), text("y")]
    );
}

#[test]
fn textarea_decodes_entities_but_script_does_not() {
    assert_eq!(
        tokenize("<textarea>a&lt;b</textarea>"),
        [start("textarea"), text("a<b"), end("textarea")]
    );
    assert_eq!(
        tokenize("<script>a&lt;b</script>"),
        [start("script"), text("a&lt;b"), end("script")]
    );
}

#[test]
fn textarea_tabs_expand_to_tab_stops() {
    let mut tokenizer = Tokenizer::with_options(
        Vec::<Token>::new(),
        TokenizerOptions {
            tab_width: 4,
            ..TokenizerOptions::default()
        },
    );

    tokenizer.feed("<textarea>a\tb</textarea>");
    tokenizer.finish();

    assert_eq!(
        tokenizer.into_sink(),
        [start("textarea"), text("a   b"), end("textarea")]
    );
}

#[test]
fn unterminated_raw_text_flushes_as_text() {
    assert_eq!(tokenize("<script>abc"), [start("script"), text("abc")]);

    // A partially matched end marker is literal content too.
    assert_eq!(
        tokenize("<script>abc</scr"),
        [start("script"), text("abc</scr")]
    );
}

#[test]
fn lone_open_bracket_at_end_of_input_is_text() {
    assert_eq!(tokenize("a<"), [text("a<")]);
}

#[test]
fn open_entity_at_end_of_input_resolves_best_effort() {
    assert_eq!(tokenize("a&amp"), [text("a&")]);
    assert_eq!(tokenize("a&am"), [text("a&am")]);
}

#[test]
fn chunk_boundaries_never_change_the_token_sequence() {
    let documents = [
        "<b a=\"x&amp;y\">t&#65;</b><!--c--><textarea>e&gt;</textarea>done",
        "<SCRIPT>x='<b>';</SCRIPT>more",
        "a &amp b<br/><pre>\tz</pre>",
        "<!--never closed",
        "x<foo bar=1>y",
    ];

    for document in documents {
        assert_eq!(
            tokenize(document),
            tokenize_chunked(document),
            "chunked tokenization of {document:?} diverged"
        );
    }
}

#[test]
fn finish_is_idempotent() {
    let mut tokenizer = Tokenizer::new(Vec::<Token>::new());

    tokenizer.feed("x");
    tokenizer.finish();

    {
        let seen = tokenizer.sink().len();

        tokenizer.finish();
        assert_eq!(tokenizer.sink().len(), seen);
    }

    assert_eq!(tokenizer.into_sink(), [text("x")]);
}

#[test]
fn inline_script_output_is_tokenized_in_place() {
    let mut tokenizer = Tokenizer::new(Vec::<Token>::new());

    tokenizer.set_script_engine(Box::new(DocWriteEngine));
    tokenizer.feed("<script>doc.write('X')</script>more");
    tokenizer.finish();

    assert_eq!(
        tokenizer.into_sink(),
        [
            start("script"),
            text("doc.write('X')"),
            end("script"),
            text("Xmore")
        ]
    );
}

#[test]
fn inline_script_markup_is_reparsed() {
    let mut tokenizer = Tokenizer::new(Vec::<Token>::new());

    tokenizer.set_script_engine(Box::new(DocWriteEngine));
    tokenizer.feed("<script>doc.write('<b>w</b>')</script>");
    tokenizer.finish();

    assert_eq!(
        tokenizer.into_sink(),
        [
            start("script"),
            text("doc.write('<b>w</b>')"),
            end("script"),
            start("b"),
            text("w"),
            end("b")
        ]
    );
}

#[test]
fn language_attribute_blocks_execution() {
    let mut tokenizer = Tokenizer::new(Vec::<Token>::new());

    tokenizer.set_script_engine(Box::new(DocWriteEngine));
    tokenizer.feed(r#"<script language="vbscript">doc.write('X')</script>y"#);
    tokenizer.finish();

    assert_eq!(
        tokenizer.into_sink(),
        [
            start_with("script", vec![attr("language", "vbscript")]),
            text("doc.write('X')"),
            end("script"),
            text("y")
        ]
    );
}

#[test]
fn external_script_suspends_and_resumes_in_order() {
    let loader = RecordingLoader::default();
    let requests = Rc::clone(&loader.requests);
    let mut tokenizer = Tokenizer::new(Vec::<Token>::new());

    tokenizer.set_script_engine(Box::new(DocWriteEngine));
    tokenizer.set_script_loader(Box::new(loader));
    tokenizer.feed(r#"<script src="a.js"></script>tail"#);

    // Suspended before `tail`; the fetch request went to the loader.
    assert!(tokenizer.is_suspended());
    assert_eq!(requests.borrow().len(), 1);
    assert_eq!(requests.borrow()[0].url, "a.js");
    assert_eq!(
        tokenizer.sink().as_slice(),
        [
            start_with("script", vec![attr("src", "a.js")]),
            end("script")
        ]
    );

    // Input arriving during the suspension queues behind `tail`.
    tokenizer.feed("12");

    tokenizer
        .on_external_script_loaded("doc.write('X')")
        .unwrap();
    assert!(!tokenizer.is_suspended());

    tokenizer.finish();

    assert_eq!(
        tokenizer.into_sink(),
        [
            start_with("script", vec![attr("src", "a.js")]),
            end("script"),
            text("X"),
            text("tail12")
        ]
    );
}

#[test]
fn external_script_without_a_loader_does_not_suspend() {
    let mut tokenizer = Tokenizer::new(Vec::<Token>::new());

    tokenizer.feed(r#"<script src="a.js"></script>tail"#);
    assert!(!tokenizer.is_suspended());
    tokenizer.finish();

    assert_eq!(
        tokenizer.into_sink(),
        [
            start_with("script", vec![attr("src", "a.js")]),
            end("script"),
            text("tail")
        ]
    );
}

struct EmptyInterner;

impl NameInterner for EmptyInterner {
    fn tag_id(&self, _name: &str) -> Option<TagId> {
        None
    }

    fn attr_id(&self, _name: &str) -> Option<AttrId> {
        None
    }
}

#[test]
fn the_interner_decides_which_tags_produce_tokens() {
    let mut tokenizer = Tokenizer::new(Vec::<Token>::new());

    tokenizer.set_name_interner(Box::new(EmptyInterner));
    tokenizer.feed("<b>hi</b>");
    tokenizer.finish();

    assert_eq!(tokenizer.into_sink(), [text("hi")]);
}

#[test]
fn completion_without_a_pending_fetch_is_an_error() {
    let mut tokenizer = Tokenizer::new(Vec::<Token>::new());

    assert_eq!(
        tokenizer.on_external_script_loaded("x"),
        Err(TokenizerError::NoPendingFetch)
    );
}

#[test]
fn hold_buffers_and_release_replays_in_order() {
    let mut tokenizer = Tokenizer::new(Vec::<Token>::new());

    tokenizer.feed("<b>");
    tokenizer.set_hold(true);
    tokenizer.feed("hi</b>");

    assert_eq!(tokenizer.sink().as_slice(), [start("b")]);

    tokenizer.set_hold(false);
    tokenizer.finish();

    assert_eq!(
        tokenizer.into_sink(),
        [start("b"), text("hi"), end("b")]
    );
}

#[test]
fn finish_while_suspended_defers_the_final_flush() {
    let loader = RecordingLoader::default();
    let mut tokenizer = Tokenizer::new(Vec::<Token>::new());

    tokenizer.set_script_engine(Box::new(DocWriteEngine));
    tokenizer.set_script_loader(Box::new(loader));
    tokenizer.feed(r#"<script src="a.js"></script>tail"#);
    tokenizer.finish();

    // Still suspended: `tail` has not been tokenized.
    assert_eq!(tokenizer.sink().len(), 2);

    tokenizer.on_external_script_loaded("").unwrap();

    assert_eq!(
        tokenizer.into_sink(),
        [
            start_with("script", vec![attr("src", "a.js")]),
            end("script"),
            text("tail")
        ]
    );
}
