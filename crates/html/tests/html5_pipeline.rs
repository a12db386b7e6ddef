//! End-to-end pipeline tests: bytes through the session into a DOM sink.

use html::html5::{Html5ParseSession, TokenizerConfig, TreeBuilderConfig};
use html_test_support::TestDom;

fn session() -> (Html5ParseSession<TestDom>, TestDom) {
    let dom = TestDom::new();
    let session = Html5ParseSession::new(
        TokenizerConfig::default(),
        TreeBuilderConfig::default(),
        dom.clone(),
    );
    (session, dom)
}

fn parse(html: &str) -> TestDom {
    let (mut session, dom) = session();
    session.push_bytes(html.as_bytes()).expect("push");
    session.finish().expect("finish");
    drop(session);
    dom
}

fn parse_bytewise(html: &str) -> TestDom {
    let (mut session, dom) = session();
    for byte in html.as_bytes() {
        session.push_bytes(std::slice::from_ref(byte)).expect("push");
    }
    session.finish().expect("finish");
    drop(session);
    dom
}

#[test]
fn builds_a_simple_document() {
    let dom = parse("<!DOCTYPE html><p>hi</p>");
    assert_eq!(
        dom.dump(),
        "#document\n\
         | <!DOCTYPE HTML>\n\
         | <html>\n\
         |   <head>\n\
         |   <body>\n\
         |     <p>\n\
         |       \"hi\"\n"
    );
}

#[test]
fn implied_elements_for_bare_text() {
    let dom = parse("hello");
    assert_eq!(
        dom.dump(),
        "#document\n\
         | <html>\n\
         |   <head>\n\
         |   <body>\n\
         |     \"hello\"\n"
    );
}

#[test]
fn entities_resolve_in_the_tree() {
    let dom = parse("<!DOCTYPE html><p>&#128;&amp;&ampx</p>");
    assert!(
        dom.dump().contains("\"\u{20AC}&&x\""),
        "got:\n{}",
        dom.dump()
    );
}

#[test]
fn attributes_survive_with_duplicates_dropped() {
    let dom = parse("<!DOCTYPE html><p id=one id=two class='c'>x</p>");
    let dump = dom.dump();
    assert!(dump.contains("class=\"c\""), "got:\n{dump}");
    assert!(dump.contains("id=\"one\""), "got:\n{dump}");
    assert!(!dump.contains("id=\"two\""), "got:\n{dump}");
}

#[test]
fn late_html_attributes_merge_without_overwriting() {
    let dom = parse("<html lang=en><body><html lang=fr class=x>y");
    let dump = dom.dump();
    assert!(dump.contains("lang=\"en\""), "got:\n{dump}");
    assert!(dump.contains("class=\"x\""), "got:\n{dump}");
    assert!(!dump.contains("lang=\"fr\""), "got:\n{dump}");
}

#[test]
fn script_content_is_opaque() {
    let dom = parse("<!DOCTYPE html><script>if (a < b) { x(); }</script>");
    assert!(
        dom.dump().contains("\"if (a < b) { x(); }\""),
        "got:\n{}",
        dom.dump()
    );
}

#[test]
fn cdata_end_tag_mismatch_stays_inside_script() {
    let dom = parse("<!DOCTYPE html><script>a</scriptx>b</script>");
    assert!(
        dom.dump().contains("\"a</scriptx>b\""),
        "got:\n{}",
        dom.dump()
    );
}

#[test]
fn pre_and_textarea_drop_one_leading_newline() {
    let dom = parse("<!DOCTYPE html><pre>\nkeep\n</pre>");
    assert!(dom.dump().contains("\"keep\\n\"") || dom.dump().contains("\"keep\n\""));

    let dom = parse("<!DOCTYPE html><textarea>\nfoo</textarea>");
    assert!(dom.dump().contains("\"foo\""), "got:\n{}", dom.dump());
}

#[test]
fn misplaced_table_text_is_foster_parented() {
    let dom = parse("<!DOCTYPE html><table>x<tr><td>y</td></tr></table>");
    assert_eq!(
        dom.dump(),
        "#document\n\
         | <!DOCTYPE HTML>\n\
         | <html>\n\
         |   <head>\n\
         |   <body>\n\
         |     \"x\"\n\
         |     <table>\n\
         |       <tbody>\n\
         |         <tr>\n\
         |           <td>\n\
         |             \"y\"\n"
    );
}

#[test]
fn adoption_agency_matches_interop_shape() {
    let dom = parse("<b><p>x</b>y</p>");
    assert_eq!(
        dom.dump(),
        "#document\n\
         | <html>\n\
         |   <head>\n\
         |   <body>\n\
         |     <b>\n\
         |     <p>\n\
         |       <b>\n\
         |         \"x\"\n\
         |       \"y\"\n"
    );
}

#[test]
fn foreign_content_round_trip() {
    let dom = parse("<!DOCTYPE html><svg><circle/></svg><p>after</p>");
    assert_eq!(
        dom.dump(),
        "#document\n\
         | <!DOCTYPE HTML>\n\
         | <html>\n\
         |   <head>\n\
         |   <body>\n\
         |     <svg svg>\n\
         |       <svg circle>\n\
         |     <p>\n\
         |       \"after\"\n"
    );
}

#[test]
fn foreign_break_out_on_html_only_tags() {
    let dom = parse("<!DOCTYPE html><svg><desc>d<table><tr><td>cell");
    let dump = dom.dump();
    // The table must not be inside the svg subtree.
    let svg_pos = dump.find("<svg svg>").expect("svg present");
    let table_pos = dump.find("<table>").expect("table present");
    let table_indent = dump[..table_pos].rfind('\n').map(|p| table_pos - p).unwrap();
    let svg_indent = dump[..svg_pos].rfind('\n').map(|p| svg_pos - p).unwrap();
    assert_eq!(
        table_indent, svg_indent,
        "table must be a sibling of svg, not nested:\n{dump}"
    );
}

#[test]
fn xlink_attributes_are_adjusted_in_foreign_content() {
    let dom = parse("<!DOCTYPE html><svg><a xlink:href=\"u\"></a></svg>");
    assert!(
        dom.dump().contains("xlink href=\"u\""),
        "got:\n{}",
        dom.dump()
    );
}

#[test]
fn chunked_and_whole_input_build_identical_trees() {
    let inputs = [
        "<!DOCTYPE html><p a=1>x&amp;y</p><!--c-->",
        "<table>x<tr><td>y</td></tr></table>",
        "<b><p>x</b>y</p>",
        "<svg><circle/></svg><p>after</p>",
        "<title>t&lt;x</title><body>done",
        "<!DOCTYPR html>recovered",
    ];
    for input in inputs {
        let whole = parse(input);
        let bytewise = parse_bytewise(input);
        assert_eq!(
            whole.dump(),
            bytewise.dump(),
            "tree must be chunk-invariant for {input:?}"
        );
        assert_eq!(whole.to_json(), bytewise.to_json());
    }
}

#[test]
fn multibyte_input_split_mid_sequence() {
    let html = "<!DOCTYPE html><p>a\u{20AC}b</p>";
    let whole = parse(html);
    let bytewise = parse_bytewise(html);
    assert_eq!(whole.dump(), bytewise.dump());
    assert!(whole.dump().contains("a\u{20AC}b"));
}

#[test]
fn every_handle_is_released_on_teardown() {
    let inputs = [
        "<!DOCTYPE html><p>hi</p>",
        "<table><caption>c<td>x",
        "<b><i>mis</b>nested</i>",
        "<select><option>a<optgroup><option>b",
        "<svg><mtext>never</svg>",
        "<frameset><frame></frameset>",
        "deeply <b><b><b><b>nested",
    ];
    for input in inputs {
        let (mut session, dom) = session();
        session.push_bytes(input.as_bytes()).expect("push");
        session.finish().expect("finish");
        drop(session);
        assert_eq!(
            dom.outstanding_refs(),
            0,
            "outstanding refs after parsing {input:?}"
        );
        let store = dom.store();
        assert_eq!(store.refs_issued, store.refs_released);
    }
}

#[test]
fn malformed_input_reports_errors_but_never_fails() {
    let (mut session, _dom) = session();
    session
        .push_bytes(b"<table><b>misplaced</table></b></p>")
        .expect("malformed input is recoverable");
    session.finish().expect("finish");
    assert!(
        session.ctx().counters.parse_errors > 0,
        "parse errors must be reported through the context"
    );
}

#[test]
fn form_controls_are_associated_with_the_open_form() {
    let dom = parse("<!DOCTYPE html><form><input name=a></form><input name=b>");
    let store = dom.store();
    assert_eq!(store.form_associations.len(), 2);
    assert!(store.form_associations[0].1.is_some());
    assert!(store.form_associations[1].1.is_none());
}

#[test]
fn frameset_document_shape() {
    let dom = parse("<!DOCTYPE html><frameset><frame></frameset><noframes>x</noframes>");
    let dump = dom.dump();
    assert!(dump.contains("<frameset>"), "got:\n{dump}");
    assert!(dump.contains("<frame>"), "got:\n{dump}");
    assert!(dump.contains("<noframes>"), "got:\n{dump}");
}

#[test]
fn comments_after_body_attach_to_the_right_parents() {
    let dom = parse("<!DOCTYPE html><p>x</p></body><!--one--></html><!--two-->");
    let dump = dom.dump();
    // "one" hangs off the html element, "two" off the document.
    assert!(dump.contains("|   <!-- one -->"), "got:\n{dump}");
    assert!(dump.contains("| <!-- two -->"), "got:\n{dump}");
}
