//! HTML5 tree builder.
//!
//! Receives tokens from the tokenizer and dispatches each to the handler for
//! the current insertion mode. Mode handlers mutate the stack of open
//! elements, the active formatting list, and the mode itself, and drive the
//! embedder's [`TreeHandler`] to build the actual tree.
//!
//! Reprocessing is iterative: a handler returns `Flow::Reprocess` and the
//! dispatcher loops, so mode switches never recurse and the depth is bounded
//! regardless of input.

use crate::html5::shared::{
    ContentModel, DocumentParseContext, ErrorOrigin, Namespace, ParseError, ParseErrorCode, Token,
};
use crate::html5::tokenizer::SpanResolver;

use formatting::{ActiveFormattingList, FormattingEntry, TagSnapshot};
use modes::InsertionMode;
use stack::{ElementStack, OpenElement};

mod formatting;
mod handler;
mod modes;
mod stack;
mod types;

pub use handler::{AttrView, TreeHandler, TreeHandlerError};
pub use types::{ElementType, ScopeKind};

#[cfg(test)]
mod tests;

/// Configuration for the tree builder.
#[derive(Clone, Copy, Debug, Default)]
pub struct TreeBuilderConfig {
    /// Whether `<noscript>` content is opaque (scripting on) or parsed
    /// (scripting off).
    pub scripting_enabled: bool,
}

/// Outcome of processing one token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub enum TreeBuilderStep {
    Continue,
    /// The driver must switch the tokenizer's content model before the next
    /// run (raw-text elements, `<plaintext>`).
    SwitchContentModel(ContentModel),
}

/// Fatal tree construction failure. Malformed input is never fatal; this is
/// resource or handler failure only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeBuilderError {
    Handler(TreeHandlerError),
}

impl From<TreeHandlerError> for TreeBuilderError {
    fn from(e: TreeHandlerError) -> Self {
        Self::Handler(e)
    }
}

/// Borrowed view of a tag token, resolved against the input buffer.
#[derive(Clone, Debug)]
pub(crate) struct TagView<'a> {
    pub etype: ElementType,
    pub name: &'a [u8],
    pub attrs: Vec<AttrView<'a>>,
    pub self_closing: bool,
}

/// Token view consumed by the mode handlers.
#[derive(Clone, Debug)]
pub(crate) enum Tok<'a> {
    Char(&'a [u8]),
    Comment(&'a [u8]),
    Doctype {
        name: &'a [u8],
        public_id: Option<&'a [u8]>,
        system_id: Option<&'a [u8]>,
        force_quirks: bool,
        correct: bool,
    },
    Start(TagView<'a>),
    End(TagView<'a>),
    Eof,
}

impl<'a> Tok<'a> {
    fn from_token(token: &Token, resolver: &SpanResolver<'a>) -> Self {
        match token {
            Token::Character { span } => Tok::Char(resolver.bytes(*span)),
            Token::Comment { span } => Tok::Comment(resolver.bytes(*span)),
            Token::Doctype { doctype } => Tok::Doctype {
                name: resolver.bytes(doctype.name),
                public_id: doctype.public_id.map(|s| resolver.bytes(s)),
                system_id: doctype.system_id.map(|s| resolver.bytes(s)),
                force_quirks: doctype.force_quirks,
                correct: doctype.correct,
            },
            Token::StartTag { tag } => {
                let name = resolver.bytes(tag.name);
                Tok::Start(TagView {
                    etype: ElementType::from_name(name),
                    name,
                    attrs: tag
                        .attributes
                        .iter()
                        .map(|a| AttrView {
                            ns: a.ns,
                            name: resolver.bytes(a.name),
                            value: resolver.bytes(a.value),
                        })
                        .collect(),
                    self_closing: tag.self_closing,
                })
            }
            Token::EndTag { tag } => {
                // Attributes on end tags are lexically possible; discard.
                let name = resolver.bytes(tag.name);
                Tok::End(TagView {
                    etype: ElementType::from_name(name),
                    name,
                    attrs: Vec::new(),
                    self_closing: tag.self_closing,
                })
            }
            Token::Eof => Tok::Eof,
        }
    }
}

/// What a mode handler tells the dispatcher to do next.
pub(crate) enum Flow<'a> {
    Done,
    Reprocess(Tok<'a>),
}

/// HTML5 tree construction dispatcher.
pub struct Html5TreeBuilder<H: TreeHandler> {
    config: TreeBuilderConfig,
    handler: H,
    document: H::Handle,
    mode: InsertionMode,
    /// Mode to fall back to from foreign content.
    second_mode: InsertionMode,
    /// Mode to restore when a raw-text element is closed.
    cdata_return_mode: InsertionMode,
    stack: ElementStack<H::Handle>,
    formatting: ActiveFormattingList<H::Handle>,
    head_element: Option<H::Handle>,
    form_element: Option<H::Handle>,
    quirks: bool,
    /// Drop one `\n` immediately after `<pre>`/`<textarea>`.
    strip_leading_lr: bool,
    /// Redirect insertions to the foster parent (misplaced table content).
    in_table_foster: bool,
    pending_content_model: Option<ContentModel>,
    fatal: bool,
}

impl<H: TreeHandler> Html5TreeBuilder<H> {
    pub fn new(config: TreeBuilderConfig, mut handler: H) -> Self {
        let document = handler.document();
        Self {
            config,
            handler,
            document,
            mode: InsertionMode::Initial,
            second_mode: InsertionMode::InBody,
            cdata_return_mode: InsertionMode::InBody,
            stack: ElementStack::new(),
            formatting: ActiveFormattingList::new(),
            head_element: None,
            form_element: None,
            quirks: false,
            strip_leading_lr: false,
            in_table_foster: false,
            pending_content_model: None,
            fatal: false,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn quirks_mode(&self) -> bool {
        self.quirks
    }

    #[cfg(test)]
    pub(crate) fn mode(&self) -> InsertionMode {
        self.mode
    }

    /// Process one token to completion, possibly across several insertion
    /// modes. Must be called for every token of a batch before the
    /// tokenizer resumes (spans die with the batch).
    pub fn push_token(
        &mut self,
        token: &Token,
        resolver: &SpanResolver<'_>,
        ctx: &mut DocumentParseContext,
    ) -> Result<TreeBuilderStep, TreeBuilderError> {
        if self.fatal {
            return Err(TreeBuilderError::Handler(TreeHandlerError));
        }
        #[cfg(any(test, feature = "debug-stats"))]
        log::trace!(target: "html5.tree_builder", "mode {:?} token {token:?}", self.mode);

        let tok = Tok::from_token(token, resolver);
        if let Err(e) = self.run_modes(tok, ctx) {
            self.fatal = true;
            return Err(e);
        }
        Ok(match self.pending_content_model.take() {
            Some(model) => TreeBuilderStep::SwitchContentModel(model),
            None => TreeBuilderStep::Continue,
        })
    }

    /// Dispatcher loop: reprocess flags loop here instead of recursing.
    pub(crate) fn run_modes<'a>(
        &mut self,
        mut tok: Tok<'a>,
        ctx: &mut DocumentParseContext,
    ) -> Result<(), TreeBuilderError> {
        loop {
            match self.dispatch(tok, ctx)? {
                Flow::Done => return Ok(()),
                Flow::Reprocess(t) => tok = t,
            }
        }
    }

    pub(crate) fn dispatch<'a>(
        &mut self,
        tok: Tok<'a>,
        ctx: &mut DocumentParseContext,
    ) -> Result<Flow<'a>, TreeBuilderError> {
        match self.mode {
            InsertionMode::Initial => self.mode_initial(tok, ctx),
            InsertionMode::BeforeHtml => self.mode_before_html(tok, ctx),
            InsertionMode::BeforeHead => self.mode_before_head(tok, ctx),
            InsertionMode::InHead => self.mode_in_head(tok, ctx),
            InsertionMode::InHeadNoscript => self.mode_in_head_noscript(tok, ctx),
            InsertionMode::AfterHead => self.mode_after_head(tok, ctx),
            InsertionMode::InBody => self.mode_in_body(tok, ctx),
            InsertionMode::InCdataRcdata => self.mode_in_cdata_rcdata(tok, ctx),
            InsertionMode::InTable => self.mode_in_table(tok, ctx),
            InsertionMode::InCaption => self.mode_in_caption(tok, ctx),
            InsertionMode::InColumnGroup => self.mode_in_column_group(tok, ctx),
            InsertionMode::InTableBody => self.mode_in_table_body(tok, ctx),
            InsertionMode::InRow => self.mode_in_row(tok, ctx),
            InsertionMode::InCell => self.mode_in_cell(tok, ctx),
            InsertionMode::InSelect => self.mode_in_select(tok, ctx),
            InsertionMode::InSelectInTable => self.mode_in_select_in_table(tok, ctx),
            InsertionMode::AfterBody => self.mode_after_body(tok, ctx),
            InsertionMode::InFrameset => self.mode_in_frameset(tok, ctx),
            InsertionMode::AfterFrameset => self.mode_after_frameset(tok, ctx),
            InsertionMode::AfterAfterBody => self.mode_after_after_body(tok, ctx),
            InsertionMode::AfterAfterFrameset => self.mode_after_after_frameset(tok, ctx),
            InsertionMode::InForeignContent => self.mode_in_foreign_content(tok, ctx),
        }
    }

    // ---- shared tree operations ----

    pub(crate) fn parse_error(
        &mut self,
        ctx: &mut DocumentParseContext,
        code: ParseErrorCode,
        detail: &'static str,
    ) {
        ctx.record_error(ParseError {
            origin: ErrorOrigin::TreeBuilder,
            code,
            position: 0,
            detail: Some(detail),
        });
    }

    pub(crate) fn current(&self) -> &OpenElement<H::Handle> {
        self.stack
            .current()
            .expect("stack of open elements must not be empty past BeforeHtml")
    }

    pub(crate) fn current_type(&self) -> ElementType {
        self.current().etype
    }

    /// Append `node` under the current node, or under the foster parent
    /// when misplaced table content is being redirected.
    pub(crate) fn append_node(&mut self, node: &H::Handle) -> Result<(), TreeBuilderError> {
        let foster = self.in_table_foster
            && matches!(
                self.current_type(),
                ElementType::Table
                    | ElementType::Tbody
                    | ElementType::Tfoot
                    | ElementType::Thead
                    | ElementType::Tr
            );
        if foster {
            self.foster_insert(node)
        } else {
            let parent = self.current().node.clone();
            self.handler.append_child(&parent, node)?;
            Ok(())
        }
    }

    /// Insert into the table's parent immediately before the table, falling
    /// back to the element above the table on the stack.
    pub(crate) fn foster_insert(&mut self, node: &H::Handle) -> Result<(), TreeBuilderError> {
        let Some(table_idx) = self
            .stack
            .iter()
            .rposition(|e| e.etype == ElementType::Table)
        else {
            let parent = self.current().node.clone();
            self.handler.append_child(&parent, node)?;
            return Ok(());
        };
        let table = self.stack.get(table_idx).expect("indexed entry").node.clone();
        match self.handler.get_parent(&table)? {
            Some(parent) => self.handler.insert_before(&parent, node, &table)?,
            None => {
                let above = self
                    .stack
                    .get(table_idx - 1)
                    .expect("table cannot be the stack bottom")
                    .node
                    .clone();
                self.handler.append_child(&above, node)?;
            }
        }
        Ok(())
    }

    pub(crate) fn insert_element(
        &mut self,
        ns: Namespace,
        etype: ElementType,
        name: &[u8],
        attrs: &[AttrView<'_>],
    ) -> Result<H::Handle, TreeBuilderError> {
        let node = self.handler.create_element(ns, name, attrs)?;
        self.append_node(&node)?;
        self.handler.ref_node(&node);
        self.stack.push(OpenElement {
            ns,
            etype,
            node: node.clone(),
        });
        Ok(node)
    }

    pub(crate) fn insert_element_no_push(
        &mut self,
        ns: Namespace,
        name: &[u8],
        attrs: &[AttrView<'_>],
    ) -> Result<H::Handle, TreeBuilderError> {
        let node = self.handler.create_element(ns, name, attrs)?;
        self.append_node(&node)?;
        Ok(node)
    }

    pub(crate) fn insert_from_view(
        &mut self,
        view: &TagView<'_>,
    ) -> Result<H::Handle, TreeBuilderError> {
        self.insert_element(Namespace::Html, view.etype, view.name, &view.attrs)
    }

    pub(crate) fn append_text(&mut self, text: &[u8]) -> Result<(), TreeBuilderError> {
        let mut text = text;
        if self.strip_leading_lr {
            self.strip_leading_lr = false;
            if text.first() == Some(&b'\n') {
                text = &text[1..];
            }
        }
        if text.is_empty() {
            return Ok(());
        }
        let node = self.handler.create_text(text)?;
        self.append_node(&node)
    }

    pub(crate) fn append_comment(&mut self, text: &[u8]) -> Result<(), TreeBuilderError> {
        let node = self.handler.create_comment(text)?;
        let parent = self.current().node.clone();
        self.handler.append_child(&parent, &node)?;
        Ok(())
    }

    pub(crate) fn append_comment_to(
        &mut self,
        parent: &H::Handle,
        text: &[u8],
    ) -> Result<(), TreeBuilderError> {
        let node = self.handler.create_comment(text)?;
        self.handler.append_child(parent, &node)?;
        Ok(())
    }

    pub(crate) fn pop_and_unref(&mut self) -> Option<ElementType> {
        let entry = self.stack.pop()?;
        self.handler.unref_node(&entry.node);
        Some(entry.etype)
    }

    /// Pop until `etype` has been popped (inclusive).
    pub(crate) fn pop_until(&mut self, etype: ElementType) {
        while let Some(popped) = self.pop_and_unref() {
            if popped == etype {
                break;
            }
        }
    }

    pub(crate) fn pop_until_any(&mut self, types: &[ElementType]) -> Option<ElementType> {
        while let Some(popped) = self.pop_and_unref() {
            if types.contains(&popped) {
                return Some(popped);
            }
        }
        None
    }

    /// Remove a node from anywhere in the stack (late head re-entry).
    pub(crate) fn stack_remove_node(&mut self, node: &H::Handle) {
        if let Some(idx) = self.stack.position_of_node(node) {
            let entry = self.stack.remove(idx);
            self.handler.unref_node(&entry.node);
        }
    }

    pub(crate) fn generate_implied_end_tags(&mut self, except: Option<ElementType>) {
        loop {
            let Some(current) = self.stack.current_type() else {
                return;
            };
            let implied = matches!(
                current,
                ElementType::Dd
                    | ElementType::Dt
                    | ElementType::Li
                    | ElementType::Option
                    | ElementType::Optgroup
                    | ElementType::P
                    | ElementType::Rp
                    | ElementType::Rt
            );
            if !implied || Some(current) == except {
                return;
            }
            self.pop_and_unref();
        }
    }

    /// Act as if `</p>` had been seen, when a `p` is in scope.
    pub(crate) fn close_p_if_in_scope(&mut self, ctx: &mut DocumentParseContext) {
        if self.stack.in_scope(ElementType::P, ScopeKind::Default) {
            self.generate_implied_end_tags(Some(ElementType::P));
            if self.current_type() != ElementType::P {
                self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "unclosed element in p");
            }
            self.pop_until(ElementType::P);
        }
    }

    /// Enter the generic raw-text collection mode for the element just
    /// described by `view`.
    pub(crate) fn parse_generic(
        &mut self,
        view: &TagView<'_>,
        model: ContentModel,
    ) -> Result<(), TreeBuilderError> {
        self.insert_from_view(view)?;
        self.pending_content_model = Some(model);
        self.cdata_return_mode = self.mode;
        self.mode = InsertionMode::InCdataRcdata;
        Ok(())
    }

    /// Walk the stack for an end tag no other rule claimed.
    pub(crate) fn any_other_end_tag(
        &mut self,
        etype: ElementType,
        ctx: &mut DocumentParseContext,
    ) {
        for i in (0..self.stack.len()).rev() {
            let entry = self.stack.get(i).expect("indexed entry");
            if entry.etype == etype {
                self.generate_implied_end_tags(Some(etype));
                if self.current_type() != etype {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "misnested end tag");
                }
                while self.stack.len() > i {
                    self.pop_and_unref();
                }
                return;
            }
            if entry.etype.is_special_or_scoping() {
                self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "ignored end tag");
                return;
            }
        }
    }

    /// Select the insertion mode matching the current stack contents.
    pub(crate) fn reset_insertion_mode(&mut self) {
        let mut mode = InsertionMode::InBody;
        for (i, entry) in self.stack.iter().enumerate().rev() {
            let last = i == 0;
            if entry.ns != Namespace::Html {
                continue;
            }
            mode = match entry.etype {
                ElementType::Select => InsertionMode::InSelect,
                ElementType::Td | ElementType::Th => InsertionMode::InCell,
                ElementType::Tr => InsertionMode::InRow,
                ElementType::Tbody | ElementType::Tfoot | ElementType::Thead => {
                    InsertionMode::InTableBody
                }
                ElementType::Caption => InsertionMode::InCaption,
                ElementType::Colgroup => InsertionMode::InColumnGroup,
                ElementType::Table => InsertionMode::InTable,
                ElementType::Head | ElementType::Body => InsertionMode::InBody,
                ElementType::Frameset => InsertionMode::InFrameset,
                ElementType::Html => InsertionMode::BeforeHead,
                _ if last => InsertionMode::InBody,
                _ => continue,
            };
            break;
        }
        if self
            .stack
            .current()
            .map(|e| e.ns != Namespace::Html)
            .unwrap_or(false)
        {
            self.second_mode = mode;
            self.mode = InsertionMode::InForeignContent;
        } else {
            self.mode = mode;
        }
    }

    pub(crate) fn add_missing_attributes(
        &mut self,
        node: &H::Handle,
        attrs: &[AttrView<'_>],
    ) -> Result<(), TreeBuilderError> {
        if attrs.is_empty() {
            return Ok(());
        }
        self.handler.add_attributes(node, attrs)?;
        Ok(())
    }

    /// Whitespace split used by the early and table modes.
    pub(crate) fn split_leading_ws(text: &[u8]) -> (&[u8], &[u8]) {
        let boundary = text
            .iter()
            .position(|b| !matches!(b, b'\t' | b'\n' | b'\x0B' | b'\x0C' | b'\r' | b' '))
            .unwrap_or(text.len());
        text.split_at(boundary)
    }

    pub(crate) fn is_all_ws(text: &[u8]) -> bool {
        Self::split_leading_ws(text).1.is_empty()
    }
}

impl<H: TreeHandler> Drop for Html5TreeBuilder<H> {
    fn drop(&mut self) {
        for entry in self.stack.take_all() {
            self.handler.unref_node(&entry.node);
        }
        for entry in self.formatting.take_all() {
            if let FormattingEntry::Element(el) = entry {
                self.handler.unref_node(&el.node);
            }
        }
        if let Some(head) = self.head_element.take() {
            self.handler.unref_node(&head);
        }
        if let Some(form) = self.form_element.take() {
            self.handler.unref_node(&form);
        }
    }
}

/// Build an owned snapshot of a tag for the active formatting list.
pub(crate) fn snapshot_of(view: &TagView<'_>) -> TagSnapshot {
    TagSnapshot::from_view(view.name, &view.attrs)
}
