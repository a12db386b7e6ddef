use super::{
    AttrView, Html5TreeBuilder, TreeBuilderConfig, TreeBuilderStep, TreeHandler, TreeHandlerError,
};
use crate::html5::shared::{ContentModel, DocumentParseContext, Input, Namespace};
use crate::html5::tokenizer::{Html5Tokenizer, TokenizeResult, TokenizerConfig};
use crate::html5::tree_builder::modes::InsertionMode;
use std::cell::RefCell;
use std::rc::Rc;

/// Call-recording sink: node labels, handler call order, and per-node
/// reference counts.
#[derive(Debug, Default)]
struct Log {
    names: Vec<String>,
    parents: Vec<Option<usize>>,
    calls: Vec<String>,
    refs: Vec<i64>,
}

impl Log {
    fn add(&mut self, label: String) -> usize {
        self.names.push(label);
        self.parents.push(None);
        self.refs.push(0);
        self.names.len() - 1
    }

    fn outstanding(&self) -> i64 {
        self.refs.iter().sum()
    }
}

#[derive(Clone, Default)]
struct LogSink(Rc<RefCell<Log>>);

impl TreeHandler for LogSink {
    type Handle = usize;

    fn document(&mut self) -> usize {
        let mut log = self.0.borrow_mut();
        if log.names.is_empty() {
            log.add("#document".to_string());
        }
        0
    }

    fn create_element(
        &mut self,
        ns: Namespace,
        name: &[u8],
        _attrs: &[AttrView<'_>],
    ) -> Result<usize, TreeHandlerError> {
        let mut log = self.0.borrow_mut();
        let label = format!("<{}{}>", ns_prefix(ns), String::from_utf8_lossy(name));
        let id = log.add(label.clone());
        log.calls.push(format!("create {label}"));
        Ok(id)
    }

    fn create_text(&mut self, text: &[u8]) -> Result<usize, TreeHandlerError> {
        let mut log = self.0.borrow_mut();
        let label = format!("\"{}\"", String::from_utf8_lossy(text));
        let id = log.add(label.clone());
        log.calls.push(format!("create {label}"));
        Ok(id)
    }

    fn create_comment(&mut self, text: &[u8]) -> Result<usize, TreeHandlerError> {
        let mut log = self.0.borrow_mut();
        let label = format!("<!--{}-->", String::from_utf8_lossy(text));
        let id = log.add(label.clone());
        log.calls.push(format!("create {label}"));
        Ok(id)
    }

    fn create_doctype(
        &mut self,
        name: &[u8],
        _public_id: Option<&[u8]>,
        _system_id: Option<&[u8]>,
    ) -> Result<usize, TreeHandlerError> {
        let mut log = self.0.borrow_mut();
        let label = format!("<!DOCTYPE {}>", String::from_utf8_lossy(name));
        let id = log.add(label.clone());
        log.calls.push(format!("create {label}"));
        Ok(id)
    }

    fn clone_node(&mut self, node: &usize) -> Result<usize, TreeHandlerError> {
        let mut log = self.0.borrow_mut();
        let label = log.names[*node].clone();
        let id = log.add(label.clone());
        log.calls.push(format!("clone {label}"));
        Ok(id)
    }

    fn append_child(&mut self, parent: &usize, child: &usize) -> Result<(), TreeHandlerError> {
        let mut log = self.0.borrow_mut();
        let line = format!("append {} -> {}", log.names[*child], log.names[*parent]);
        log.calls.push(line);
        log.parents[*child] = Some(*parent);
        Ok(())
    }

    fn insert_before(
        &mut self,
        parent: &usize,
        child: &usize,
        before: &usize,
    ) -> Result<(), TreeHandlerError> {
        let mut log = self.0.borrow_mut();
        let line = format!(
            "insert {} -> {} before {}",
            log.names[*child], log.names[*parent], log.names[*before]
        );
        log.calls.push(line);
        log.parents[*child] = Some(*parent);
        Ok(())
    }

    fn detach(&mut self, node: &usize) -> Result<(), TreeHandlerError> {
        self.0.borrow_mut().parents[*node] = None;
        Ok(())
    }

    fn reparent_children(&mut self, from: &usize, to: &usize) -> Result<(), TreeHandlerError> {
        let mut log = self.0.borrow_mut();
        let line = format!("reparent {} -> {}", log.names[*from], log.names[*to]);
        log.calls.push(line);
        Ok(())
    }

    fn get_parent(&mut self, node: &usize) -> Result<Option<usize>, TreeHandlerError> {
        Ok(self.0.borrow().parents[*node])
    }

    fn add_attributes(
        &mut self,
        node: &usize,
        _attrs: &[AttrView<'_>],
    ) -> Result<(), TreeHandlerError> {
        let mut log = self.0.borrow_mut();
        let line = format!("add_attributes {}", log.names[*node]);
        log.calls.push(line);
        Ok(())
    }

    fn associate_form(
        &mut self,
        _form: Option<&usize>,
        _node: &usize,
    ) -> Result<(), TreeHandlerError> {
        Ok(())
    }

    fn ref_node(&mut self, node: &usize) {
        self.0.borrow_mut().refs[*node] += 1;
    }

    fn unref_node(&mut self, node: &usize) {
        let mut log = self.0.borrow_mut();
        assert!(log.refs[*node] > 0, "unref below zero: {}", log.names[*node]);
        log.refs[*node] -= 1;
    }
}

fn ns_prefix(ns: Namespace) -> &'static str {
    match ns {
        Namespace::Html => "",
        Namespace::MathMl => "math:",
        Namespace::Svg => "svg:",
        Namespace::XLink => "xlink:",
        Namespace::Xml => "xml:",
        Namespace::Xmlns => "xmlns:",
    }
}

/// Tokenize `html` and feed every token to the builder, honouring
/// content-model directives like the session does. `finish` controls
/// whether an EOF token is delivered at the end.
fn feed(
    builder: &mut Html5TreeBuilder<LogSink>,
    ctx: &mut DocumentParseContext,
    html: &str,
    finish: bool,
) {
    let mut tokenizer = Html5Tokenizer::new(TokenizerConfig::default());
    let mut input = Input::new();
    input.push_str(html);
    if finish {
        input.finish();
    }
    loop {
        let result = tokenizer.run(&mut input, ctx);
        let batch = tokenizer.next_batch(&mut input);
        if batch.is_empty()
            && matches!(
                result,
                TokenizeResult::NeedMoreInput | TokenizeResult::EmittedEof
            )
        {
            break;
        }
        let resolver = batch.resolver();
        for token in batch.iter() {
            match builder
                .push_token(token, &resolver, ctx)
                .expect("tree construction must not fail in tests")
            {
                TreeBuilderStep::Continue => {}
                TreeBuilderStep::SwitchContentModel(model) => {
                    tokenizer.set_content_model(model);
                }
            }
        }
        drop(batch);
        if result == TokenizeResult::EmittedEof {
            break;
        }
    }
}

fn parse(html: &str) -> Rc<RefCell<Log>> {
    let sink = LogSink::default();
    let log = sink.0.clone();
    let mut ctx = DocumentParseContext::new();
    let mut builder = Html5TreeBuilder::new(TreeBuilderConfig::default(), sink);
    feed(&mut builder, &mut ctx, html, true);
    drop(builder);
    log
}

#[test]
fn builds_the_document_skeleton() {
    let log = parse("<p>hi</p>");
    let calls = &log.borrow().calls;
    let expected_prefix = [
        "create <html>",
        "append <html> -> #document",
        "create <head>",
        "append <head> -> <html>",
        "create <body>",
        "append <body> -> <html>",
        "create <p>",
        "append <p> -> <body>",
        "create \"hi\"",
        "append \"hi\" -> <p>",
    ];
    assert_eq!(&calls[..expected_prefix.len()], &expected_prefix[..]);
}

#[test]
fn every_ref_is_balanced_by_teardown() {
    for html in [
        "<p>hi</p>",
        "<table><tr><td>x</td></tr></table>",
        "<b><i>mis</b>nested</i>",
        "<svg><circle/><table><tr>",
        "<select><option>a<option>b</select>",
        "unterminated <em><strong>markup",
    ] {
        let log = parse(html);
        assert_eq!(
            log.borrow().outstanding(),
            0,
            "unbalanced refs for {html:?}"
        );
    }
}

#[test]
fn doctype_controls_quirks_mode() {
    let sink = LogSink::default();
    let mut ctx = DocumentParseContext::new();
    let mut builder = Html5TreeBuilder::new(TreeBuilderConfig::default(), sink);
    feed(&mut builder, &mut ctx, "<!DOCTYPE html><p>x", true);
    assert!(!builder.quirks_mode());

    let sink = LogSink::default();
    let mut ctx = DocumentParseContext::new();
    let mut builder = Html5TreeBuilder::new(TreeBuilderConfig::default(), sink);
    feed(&mut builder, &mut ctx, "<p>x", true);
    assert!(builder.quirks_mode(), "missing doctype forces quirks");
}

#[test]
fn raw_text_elements_switch_the_content_model() {
    let cases = [
        ("<script>", ContentModel::Cdata),
        ("<style>", ContentModel::Cdata),
        ("<title>", ContentModel::Rcdata),
        ("<textarea>", ContentModel::Rcdata),
        ("<plaintext>", ContentModel::Plaintext),
    ];
    for (html, expected) in cases {
        let sink = LogSink::default();
        let mut ctx = DocumentParseContext::new();
        let mut builder = Html5TreeBuilder::new(TreeBuilderConfig::default(), sink);
        let mut tokenizer = Html5Tokenizer::new(TokenizerConfig::default());
        let mut input = Input::new();
        input.push_str(html);
        let _ = tokenizer.run(&mut input, &mut ctx);
        let batch = tokenizer.next_batch(&mut input);
        let resolver = batch.resolver();
        let mut directive = None;
        for token in batch.iter() {
            if let TreeBuilderStep::SwitchContentModel(model) = builder
                .push_token(token, &resolver, &mut ctx)
                .expect("no failure")
            {
                directive = Some(model);
            }
        }
        assert_eq!(directive, Some(expected), "directive for {html}");
    }
}

#[test]
fn foreign_content_enters_and_breaks_out() {
    let sink = LogSink::default();
    let log = sink.0.clone();
    let mut ctx = DocumentParseContext::new();
    let mut builder = Html5TreeBuilder::new(TreeBuilderConfig::default(), sink);

    feed(&mut builder, &mut ctx, "<svg><circle></circle>", false);
    assert_eq!(builder.mode(), InsertionMode::InForeignContent);
    assert!(log.borrow().calls.iter().any(|c| c == "create <svg:circle>"));

    // An HTML-only tag pops the foreign elements and reprocesses in the
    // secondary mode.
    feed(&mut builder, &mut ctx, "<table>", false);
    assert_eq!(builder.mode(), InsertionMode::InTable);
    assert!(log.borrow().calls.iter().any(|c| c == "create <table>"));
    drop(builder);
    assert_eq!(log.borrow().outstanding(), 0);
}

#[test]
fn mathml_text_integration_point_delegates() {
    let log = parse("<math><mtext><b>bold</b></mtext>");
    // The b element inside an integration point is an HTML element.
    assert!(log.borrow().calls.iter().any(|c| c == "create <b>"));
    assert!(log.borrow().calls.iter().any(|c| c == "create <math:mtext>"));
}

#[test]
fn misplaced_table_text_is_foster_parented() {
    let log = parse("<table>oops<tr></tr></table>");
    let calls = &log.borrow().calls;
    assert!(
        calls.iter().any(|c| c.starts_with("insert \"oops\"")),
        "text must be inserted before the table, got: {calls:#?}"
    );
}

#[test]
fn adoption_agency_clones_the_formatting_element() {
    let log = parse("<b><p>x</b>y</p>");
    let calls = &log.borrow().calls;
    assert!(
        calls.iter().any(|c| c == "clone <b>"),
        "misnested b must be cloned into the block, got: {calls:#?}"
    );
    assert!(
        calls.iter().any(|c| c == "reparent <p> -> <b>"),
        "the block's children move under the clone, got: {calls:#?}"
    );
}

#[test]
fn handler_failure_is_fatal() {
    struct FailingSink {
        inner: LogSink,
        fail_after: usize,
        created: usize,
    }
    impl TreeHandler for FailingSink {
        type Handle = usize;
        fn document(&mut self) -> usize {
            self.inner.document()
        }
        fn create_element(
            &mut self,
            ns: Namespace,
            name: &[u8],
            attrs: &[AttrView<'_>],
        ) -> Result<usize, TreeHandlerError> {
            self.created += 1;
            if self.created > self.fail_after {
                return Err(TreeHandlerError);
            }
            self.inner.create_element(ns, name, attrs)
        }
        fn create_text(&mut self, text: &[u8]) -> Result<usize, TreeHandlerError> {
            self.inner.create_text(text)
        }
        fn create_comment(&mut self, text: &[u8]) -> Result<usize, TreeHandlerError> {
            self.inner.create_comment(text)
        }
        fn create_doctype(
            &mut self,
            name: &[u8],
            public_id: Option<&[u8]>,
            system_id: Option<&[u8]>,
        ) -> Result<usize, TreeHandlerError> {
            self.inner.create_doctype(name, public_id, system_id)
        }
        fn clone_node(&mut self, node: &usize) -> Result<usize, TreeHandlerError> {
            self.inner.clone_node(node)
        }
        fn append_child(&mut self, parent: &usize, child: &usize) -> Result<(), TreeHandlerError> {
            self.inner.append_child(parent, child)
        }
        fn insert_before(
            &mut self,
            parent: &usize,
            child: &usize,
            before: &usize,
        ) -> Result<(), TreeHandlerError> {
            self.inner.insert_before(parent, child, before)
        }
        fn detach(&mut self, node: &usize) -> Result<(), TreeHandlerError> {
            self.inner.detach(node)
        }
        fn reparent_children(&mut self, from: &usize, to: &usize) -> Result<(), TreeHandlerError> {
            self.inner.reparent_children(from, to)
        }
        fn get_parent(&mut self, node: &usize) -> Result<Option<usize>, TreeHandlerError> {
            self.inner.get_parent(node)
        }
        fn add_attributes(
            &mut self,
            node: &usize,
            attrs: &[AttrView<'_>],
        ) -> Result<(), TreeHandlerError> {
            self.inner.add_attributes(node, attrs)
        }
        fn associate_form(
            &mut self,
            form: Option<&usize>,
            node: &usize,
        ) -> Result<(), TreeHandlerError> {
            self.inner.associate_form(form, node)
        }
        fn ref_node(&mut self, node: &usize) {
            self.inner.ref_node(node)
        }
        fn unref_node(&mut self, node: &usize) {
            self.inner.unref_node(node)
        }
    }

    let sink = FailingSink {
        inner: LogSink::default(),
        fail_after: 2,
        created: 0,
    };
    let mut ctx = DocumentParseContext::new();
    let mut builder = Html5TreeBuilder::new(TreeBuilderConfig::default(), sink);
    let mut tokenizer = Html5Tokenizer::new(TokenizerConfig::default());
    let mut input = Input::new();
    input.push_str("<div><div><div>");
    input.finish();
    let mut failed = false;
    loop {
        let result = tokenizer.run(&mut input, &mut ctx);
        let batch = tokenizer.next_batch(&mut input);
        if batch.is_empty()
            && matches!(
                result,
                TokenizeResult::NeedMoreInput | TokenizeResult::EmittedEof
            )
        {
            break;
        }
        let resolver = batch.resolver();
        for token in batch.iter() {
            if builder.push_token(token, &resolver, &mut ctx).is_err() {
                failed = true;
            }
        }
        drop(batch);
        if failed || result == TokenizeResult::EmittedEof {
            break;
        }
    }
    assert!(failed, "handler failure must propagate as fatal");
}
