use super::{Html5Tokenizer, TokenFmt, TokenizeResult, TokenizerConfig};
use crate::html5::shared::{ContentModel, DocumentParseContext, Input, Token};

fn pump(tokenizer: &mut Html5Tokenizer, input: &mut Input, ctx: &mut DocumentParseContext) {
    loop {
        match tokenizer.run(input, ctx) {
            TokenizeResult::Progress => continue,
            TokenizeResult::NeedMoreInput | TokenizeResult::EmittedEof => break,
        }
    }
}

fn drain_all_fmt(tokenizer: &mut Html5Tokenizer, input: &mut Input) -> Vec<String> {
    let mut out = Vec::new();
    loop {
        let batch = tokenizer.next_batch(input);
        if batch.is_empty() {
            break;
        }
        let fmt = TokenFmt::new(batch.resolver());
        for token in batch.iter() {
            out.push(fmt.format_token(token));
        }
    }
    out
}

fn run_chunks(chunks: &[&str]) -> Vec<String> {
    let mut ctx = DocumentParseContext::new();
    let mut tokenizer = Html5Tokenizer::new(TokenizerConfig::default());
    let mut input = Input::new();
    let mut out = Vec::new();
    for chunk in chunks {
        input.push_str(chunk);
        pump(&mut tokenizer, &mut input, &mut ctx);
        out.extend(drain_all_fmt(&mut tokenizer, &mut input));
    }
    input.finish();
    pump(&mut tokenizer, &mut input, &mut ctx);
    out.extend(drain_all_fmt(&mut tokenizer, &mut input));
    out
}

fn run_whole(text: &str) -> Vec<String> {
    run_chunks(&[text])
}

fn run_bytewise(text: &str) -> Vec<String> {
    let chunks: Vec<String> = text.chars().map(|c| c.to_string()).collect();
    let refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
    run_chunks(&refs)
}

#[test]
fn simple_tag_sequence() {
    assert_eq!(
        run_whole("<p>hi</p>"),
        vec![
            "START name=p attrs=[] self_closing=false",
            "CHAR text=\"hi\"",
            "END name=p",
            "EOF",
        ]
    );
}

#[test]
fn uppercase_names_are_folded_in_place() {
    assert_eq!(
        run_whole("<DIV CLASS=Box>"),
        vec!["START name=div attrs=[class=\"Box\"] self_closing=false", "EOF"]
    );
}

#[test]
fn duplicate_attributes_keep_first() {
    assert_eq!(
        run_whole("<p a=1 a=2>"),
        vec!["START name=p attrs=[a=\"1\"] self_closing=false", "EOF"]
    );
}

#[test]
fn attribute_quoting_styles() {
    assert_eq!(
        run_whole("<a one=1 two='2' three=\"3\" four>"),
        vec![
            "START name=a attrs=[one=\"1\" two=\"2\" three=\"3\" four=\"\"] self_closing=false",
            "EOF",
        ]
    );
}

#[test]
fn self_closing_flag() {
    assert_eq!(
        run_whole("<br/>"),
        vec!["START name=br attrs=[] self_closing=true", "EOF"]
    );
    assert_eq!(
        run_whole("<br />"),
        vec!["START name=br attrs=[] self_closing=true", "EOF"]
    );
    // A stray slash in the middle of a tag does not make it self-closing.
    assert_eq!(
        run_whole("<br/ x>"),
        vec!["START name=br attrs=[x=\"\"] self_closing=false", "EOF"]
    );
}

#[test]
fn numeric_entity_with_cp1252_remap() {
    assert_eq!(
        run_whole("&#128;"),
        vec!["CHAR text=\"\u{20AC}\"", "EOF"]
    );
}

#[test]
fn hex_entity() {
    assert_eq!(
        run_whole("a&#x20AC;b"),
        vec![
            "CHAR text=\"a\"",
            "CHAR text=\"\u{20AC}\"",
            "CHAR text=\"b\"",
            "EOF",
        ]
    );
}

#[test]
fn numeric_entity_out_of_range_and_nul() {
    assert_eq!(
        run_whole("&#0;"),
        vec!["CHAR text=\"\u{FFFD}\"", "EOF"]
    );
    assert_eq!(
        run_whole("&#x110000;"),
        vec!["CHAR text=\"\u{FFFD}\"", "EOF"]
    );
}

#[test]
fn numeric_entity_without_digits_backs_out() {
    assert_eq!(
        run_whole("&#z"),
        vec!["CHAR text=\"&\"", "CHAR text=\"#z\"", "EOF"]
    );
}

#[test]
fn named_entity_greedy_longest_match_without_semicolon() {
    // `&amp` matches; the trailing `x` is re-emitted as data.
    assert_eq!(
        run_whole("&ampx"),
        vec!["CHAR text=\"&\"", "CHAR text=\"x\"", "EOF"]
    );
}

#[test]
fn named_entity_consumes_exact_semicolon() {
    assert_eq!(
        run_whole("&not;x"),
        vec!["CHAR text=\"\u{AC}\"", "CHAR text=\"x\"", "EOF"]
    );
    // `&notx;` resolves the `not` prefix and leaves `x;` as data.
    assert_eq!(
        run_whole("&notx;"),
        vec!["CHAR text=\"\u{AC}\"", "CHAR text=\"x;\"", "EOF"]
    );
}

#[test]
fn unknown_named_entity_emits_ampersand() {
    assert_eq!(
        run_whole("&zz;"),
        vec!["CHAR text=\"&\"", "CHAR text=\"zz;\"", "EOF"]
    );
}

#[test]
fn entity_in_attribute_value() {
    assert_eq!(
        run_whole("<a href=\"x&amp;y\">"),
        vec!["START name=a attrs=[href=\"x&y\"] self_closing=false", "EOF"]
    );
}

#[test]
fn comment_tokens() {
    assert_eq!(
        run_whole("<!--a-->"),
        vec!["COMMENT text=\"a\"", "EOF"]
    );
    // The extra dash stays in the comment text.
    assert_eq!(
        run_whole("<!--a--->"),
        vec!["COMMENT text=\"a-\"", "EOF"]
    );
    assert_eq!(
        run_whole("<!-x>"),
        vec!["COMMENT text=\"-x\"", "EOF"]
    );
    assert_eq!(
        run_whole("<?php x?>"),
        vec!["COMMENT text=\"?php x?\"", "EOF"]
    );
}

#[test]
fn malformed_doctype_recovers_as_bogus_comment() {
    // The matched letters are pushed back and reparsed as a comment.
    assert_eq!(
        run_whole("<!DOCTYPR html>"),
        vec!["COMMENT text=\"DOCTYPR html\"", "EOF"]
    );
}

#[test]
fn doctype_name_is_uppercased_and_checked() {
    assert_eq!(
        run_whole("<!DOCTYPE html>"),
        vec!["DOCTYPE name=\"HTML\" force_quirks=false correct=true", "EOF"]
    );
    assert_eq!(
        run_whole("<!doctype HtMl>"),
        vec!["DOCTYPE name=\"HTML\" force_quirks=false correct=true", "EOF"]
    );
    assert_eq!(
        run_whole("<!DOCTYPE banana>"),
        vec![
            "DOCTYPE name=\"BANANA\" force_quirks=false correct=false",
            "EOF",
        ]
    );
}

#[test]
fn doctype_with_trailing_junk_goes_bogus() {
    assert_eq!(
        run_whole("<!DOCTYPE html PUBLIC \"x\">"),
        vec!["DOCTYPE name=\"HTML\" force_quirks=true correct=true", "EOF"]
    );
}

#[test]
fn doctype_truncated_at_eof() {
    assert_eq!(
        run_whole("<!DOCTYPE html"),
        vec!["DOCTYPE name=\"HTML\" force_quirks=true correct=true", "EOF"]
    );
}

fn run_cdata(content_model: ContentModel, opener: &str, rest: &str) -> (Vec<String>, ContentModel) {
    let mut ctx = DocumentParseContext::new();
    let mut tokenizer = Html5Tokenizer::new(TokenizerConfig::default());
    let mut input = Input::new();
    input.push_str(opener);
    pump(&mut tokenizer, &mut input, &mut ctx);
    let mut out = drain_all_fmt(&mut tokenizer, &mut input);
    assert_eq!(out.len(), 1, "opener should produce exactly the start tag");
    tokenizer.set_content_model(content_model);
    input.push_str(rest);
    input.finish();
    pump(&mut tokenizer, &mut input, &mut ctx);
    out.extend(drain_all_fmt(&mut tokenizer, &mut input));
    (out, tokenizer.content_model())
}

#[test]
fn cdata_close_tag_mismatch_stays_text() {
    let (tokens, model) = run_cdata(ContentModel::Cdata, "<script>", "</scriptx>");
    assert_eq!(
        tokens,
        vec![
            "START name=script attrs=[] self_closing=false",
            "CHAR text=\"</\"",
            "CHAR text=\"scriptx>\"",
            "EOF",
        ]
    );
    assert_eq!(model, ContentModel::Cdata);
}

#[test]
fn cdata_close_tag_match_resets_content_model() {
    let (tokens, model) = run_cdata(ContentModel::Cdata, "<script>", "a<b</SCRIPT>");
    assert_eq!(
        tokens,
        vec![
            "START name=script attrs=[] self_closing=false",
            "CHAR text=\"a\"",
            "CHAR text=\"<\"",
            "CHAR text=\"b\"",
            "END name=script",
            "EOF",
        ]
    );
    assert_eq!(model, ContentModel::Pcdata);
}

#[test]
fn rcdata_still_resolves_entities() {
    let (tokens, model) = run_cdata(ContentModel::Rcdata, "<title>", "a&amp;b</title>");
    assert_eq!(
        tokens,
        vec![
            "START name=title attrs=[] self_closing=false",
            "CHAR text=\"a\"",
            "CHAR text=\"&\"",
            "CHAR text=\"b\"",
            "END name=title",
            "EOF",
        ]
    );
    assert_eq!(model, ContentModel::Pcdata);
}

#[test]
fn plaintext_swallows_everything() {
    let mut ctx = DocumentParseContext::new();
    let mut tokenizer = Html5Tokenizer::new(TokenizerConfig::default());
    let mut input = Input::new();
    input.push_str("<plaintext>");
    pump(&mut tokenizer, &mut input, &mut ctx);
    let mut out = drain_all_fmt(&mut tokenizer, &mut input);
    tokenizer.set_content_model(ContentModel::Plaintext);
    input.push_str("a</plaintext>&amp;");
    input.finish();
    pump(&mut tokenizer, &mut input, &mut ctx);
    out.extend(drain_all_fmt(&mut tokenizer, &mut input));
    assert_eq!(
        out,
        vec![
            "START name=plaintext attrs=[] self_closing=false",
            "CHAR text=\"a</plaintext>&amp;\"",
            "EOF",
        ]
    );
}

#[test]
fn eof_inside_tag_emits_partial_tag() {
    assert_eq!(
        run_whole("<div a=1"),
        vec!["START name=div attrs=[a=\"1\"] self_closing=false", "EOF"]
    );
    assert_eq!(
        run_whole("</"),
        vec!["CHAR text=\"</\"", "EOF"]
    );
}

#[test]
fn stray_markup_is_emitted_as_text() {
    assert_eq!(run_whole("a<>b"), vec![
        "CHAR text=\"a\"",
        "CHAR text=\"<>\"",
        "CHAR text=\"b\"",
        "EOF",
    ]);
    assert_eq!(run_whole("1<2"), vec![
        "CHAR text=\"1\"",
        "CHAR text=\"<\"",
        "CHAR text=\"2\"",
        "EOF",
    ]);
}

#[test]
fn chunked_input_matches_whole_input() {
    let inputs = [
        "<p>hi</p>",
        "<a href=\"x&amp;y\" a=1 a=2>text&#x41;more",
        "<!--co--mment--><!DOCTYPE html><ul><li>x</li></ul>",
        "&notx;&ampx;<br/>",
        "<!DOCTYPR html>",
    ];
    for text in inputs {
        assert_eq!(
            run_whole(text),
            run_bytewise(text),
            "token sequence must be chunk-invariant for {text:?}"
        );
    }
}

/// Serialize a token stream back into markup.
fn reserialize(text: &str) -> String {
    let mut ctx = DocumentParseContext::new();
    let mut tokenizer = Html5Tokenizer::new(TokenizerConfig::default());
    let mut input = Input::new();
    input.push_str(text);
    input.finish();
    pump(&mut tokenizer, &mut input, &mut ctx);
    let batch = tokenizer.next_batch(&mut input);
    let resolver = batch.resolver();
    let mut out = String::new();
    for token in batch.iter() {
        match token {
            Token::StartTag { tag } => {
                out.push('<');
                out.push_str(resolver.text(tag.name));
                for attr in &tag.attributes {
                    out.push(' ');
                    out.push_str(resolver.text(attr.name));
                    out.push_str("=\"");
                    out.push_str(resolver.text(attr.value));
                    out.push('"');
                }
                out.push('>');
            }
            Token::EndTag { tag } => {
                out.push_str("</");
                out.push_str(resolver.text(tag.name));
                out.push('>');
            }
            Token::Character { span } => out.push_str(resolver.text(*span)),
            Token::Comment { span } => {
                out.push_str("<!--");
                out.push_str(resolver.text(*span));
                out.push_str("-->");
            }
            Token::Doctype { .. } | Token::Eof => {}
        }
    }
    out
}

#[test]
fn tokens_account_for_every_input_byte() {
    // Concatenated character/tag/comment spans plus discarded
    // metacharacters cover the whole input; the entity collapsed to its
    // replacement character.
    assert_eq!(
        reserialize("<p a=\"1\">x&amp;y</p><!--c-->"),
        "<p a=\"1\">x&y</p><!--c-->"
    );
}

#[test]
fn reserialised_markup_retokenizes_identically() {
    let inputs = ["<div id=\"a\"><p>x</p><!--c--></div>", "<ul><li>one<li>two</ul>"];
    for text in inputs {
        let serialized = reserialize(text);
        assert_eq!(
            run_whole(&serialized),
            run_whole(text),
            "round trip must be stable for {text:?}"
        );
    }
}

#[test]
fn eof_is_idempotent() {
    let mut ctx = DocumentParseContext::new();
    let mut tokenizer = Html5Tokenizer::new(TokenizerConfig::default());
    let mut input = Input::new();
    input.finish();
    assert_eq!(tokenizer.run(&mut input, &mut ctx), TokenizeResult::EmittedEof);
    assert_eq!(tokenizer.run(&mut input, &mut ctx), TokenizeResult::EmittedEof);
    let tokens = drain_all_fmt(&mut tokenizer, &mut input);
    assert_eq!(tokens, vec!["EOF".to_string()]);
}

#[test]
#[should_panic(expected = "bound to a single Input instance")]
fn run_with_foreign_input_panics() {
    let mut ctx = DocumentParseContext::new();
    let mut tokenizer = Html5Tokenizer::new(TokenizerConfig::default());
    let mut owner = Input::new();
    let _ = tokenizer.run(&mut owner, &mut ctx);
    let mut other = Input::new();
    let _ = tokenizer.run(&mut other, &mut ctx);
}

#[test]
fn pauses_after_start_tags_for_content_model_sync() {
    let mut ctx = DocumentParseContext::new();
    let mut tokenizer = Html5Tokenizer::new(TokenizerConfig::default());
    let mut input = Input::new();
    input.push_str("<script>tail");
    assert_eq!(tokenizer.run(&mut input, &mut ctx), TokenizeResult::Progress);
    let batch = tokenizer.next_batch(&mut input);
    let fmt = TokenFmt::new(batch.resolver());
    let tokens: Vec<String> = batch.iter().map(|t| fmt.format_token(t)).collect();
    assert_eq!(
        tokens,
        vec!["START name=script attrs=[] self_closing=false"],
        "run must stop right after the start tag so the driver can switch \
         the content model before `tail` is tokenized"
    );
}
