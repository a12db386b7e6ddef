//! Insertion modes and their token handlers.
//!
//! Each handler interprets one token in the context of the current stack of
//! open elements and returns `Flow::Done` or `Flow::Reprocess` for the
//! dispatcher loop. Handlers delegate to each other directly where the
//! rules say "process the token as if in mode X" (one bounded call, no
//! unbounded recursion).

use super::handler::{AttrView, TreeHandler};
use super::stack::OpenElement;
use super::types::{ElementType, ScopeKind};
use super::{snapshot_of, Flow, Html5TreeBuilder, TagView, Tok, TreeBuilderError};
use crate::html5::shared::{ContentModel, DocumentParseContext, Namespace, ParseErrorCode};

/// Tree-construction insertion mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum InsertionMode {
    #[default]
    Initial,
    BeforeHtml,
    BeforeHead,
    InHead,
    InHeadNoscript,
    AfterHead,
    InBody,
    InCdataRcdata,
    InTable,
    InCaption,
    InColumnGroup,
    InTableBody,
    InRow,
    InCell,
    InSelect,
    InSelectInTable,
    AfterBody,
    InFrameset,
    AfterFrameset,
    AfterAfterBody,
    AfterAfterFrameset,
    InForeignContent,
}

type ModeResult<'a> = Result<Flow<'a>, TreeBuilderError>;

impl<H: TreeHandler> Html5TreeBuilder<H> {
    pub(crate) fn mode_initial<'a>(
        &mut self,
        tok: Tok<'a>,
        ctx: &mut DocumentParseContext,
    ) -> ModeResult<'a> {
        match tok {
            Tok::Char(text) => {
                let (_ws, rest) = Self::split_leading_ws(text);
                if rest.is_empty() {
                    return Ok(Flow::Done);
                }
                self.parse_error(ctx, ParseErrorCode::MisplacedDoctype, "missing doctype");
                self.quirks = true;
                self.mode = InsertionMode::BeforeHtml;
                Ok(Flow::Reprocess(Tok::Char(rest)))
            }
            Tok::Comment(text) => {
                let doc = self.document.clone();
                self.append_comment_to(&doc, text)?;
                Ok(Flow::Done)
            }
            Tok::Doctype {
                name,
                public_id,
                system_id,
                force_quirks,
                correct,
            } => {
                let node = self.handler.create_doctype(name, public_id, system_id)?;
                let doc = self.document.clone();
                self.handler.append_child(&doc, &node)?;
                self.quirks = force_quirks || !correct;
                self.mode = InsertionMode::BeforeHtml;
                Ok(Flow::Done)
            }
            other => {
                self.parse_error(ctx, ParseErrorCode::MisplacedDoctype, "missing doctype");
                self.quirks = true;
                self.mode = InsertionMode::BeforeHtml;
                Ok(Flow::Reprocess(other))
            }
        }
    }

    pub(crate) fn mode_before_html<'a>(
        &mut self,
        tok: Tok<'a>,
        ctx: &mut DocumentParseContext,
    ) -> ModeResult<'a> {
        match tok {
            Tok::Doctype { .. } => {
                self.parse_error(ctx, ParseErrorCode::MisplacedDoctype, "duplicate doctype");
                Ok(Flow::Done)
            }
            Tok::Comment(text) => {
                let doc = self.document.clone();
                self.append_comment_to(&doc, text)?;
                Ok(Flow::Done)
            }
            Tok::Char(text) => {
                let (_ws, rest) = Self::split_leading_ws(text);
                if rest.is_empty() {
                    return Ok(Flow::Done);
                }
                self.create_html_root(&[])?;
                self.mode = InsertionMode::BeforeHead;
                Ok(Flow::Reprocess(Tok::Char(rest)))
            }
            Tok::Start(view) if view.etype == ElementType::Html => {
                self.create_html_root(&view.attrs)?;
                self.mode = InsertionMode::BeforeHead;
                Ok(Flow::Done)
            }
            other => {
                self.create_html_root(&[])?;
                self.mode = InsertionMode::BeforeHead;
                Ok(Flow::Reprocess(other))
            }
        }
    }

    fn create_html_root(&mut self, attrs: &[AttrView<'_>]) -> Result<(), TreeBuilderError> {
        let node = self
            .handler
            .create_element(Namespace::Html, b"html", attrs)?;
        let doc = self.document.clone();
        self.handler.append_child(&doc, &node)?;
        self.handler.ref_node(&node);
        self.stack.push(OpenElement {
            ns: Namespace::Html,
            etype: ElementType::Html,
            node,
        });
        Ok(())
    }

    pub(crate) fn mode_before_head<'a>(
        &mut self,
        tok: Tok<'a>,
        ctx: &mut DocumentParseContext,
    ) -> ModeResult<'a> {
        match tok {
            Tok::Char(text) => {
                let (_ws, rest) = Self::split_leading_ws(text);
                if rest.is_empty() {
                    return Ok(Flow::Done);
                }
                self.open_head(&[])?;
                Ok(Flow::Reprocess(Tok::Char(rest)))
            }
            Tok::Comment(text) => {
                self.append_comment(text)?;
                Ok(Flow::Done)
            }
            Tok::Doctype { .. } => {
                self.parse_error(ctx, ParseErrorCode::MisplacedDoctype, "late doctype");
                Ok(Flow::Done)
            }
            Tok::Start(view) if view.etype == ElementType::Html => self.mode_in_body(Tok::Start(view), ctx),
            Tok::Start(view) if view.etype == ElementType::Head => {
                self.open_head(&view.attrs)?;
                Ok(Flow::Done)
            }
            Tok::End(view)
                if matches!(
                    view.etype,
                    ElementType::Head | ElementType::Body | ElementType::Html | ElementType::Br
                ) =>
            {
                self.open_head(&[])?;
                Ok(Flow::Reprocess(Tok::End(view)))
            }
            Tok::End(_) => {
                self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "end tag before head");
                Ok(Flow::Done)
            }
            other => {
                self.open_head(&[])?;
                Ok(Flow::Reprocess(other))
            }
        }
    }

    fn open_head(&mut self, attrs: &[AttrView<'_>]) -> Result<(), TreeBuilderError> {
        let node = self.insert_element(Namespace::Html, ElementType::Head, b"head", attrs)?;
        self.handler.ref_node(&node);
        if let Some(old) = self.head_element.replace(node) {
            self.handler.unref_node(&old);
        }
        self.mode = InsertionMode::InHead;
        Ok(())
    }

    pub(crate) fn mode_in_head<'a>(
        &mut self,
        tok: Tok<'a>,
        ctx: &mut DocumentParseContext,
    ) -> ModeResult<'a> {
        match tok {
            Tok::Char(text) => {
                let (ws, rest) = Self::split_leading_ws(text);
                self.append_text(ws)?;
                if rest.is_empty() {
                    return Ok(Flow::Done);
                }
                self.pop_and_unref();
                self.mode = InsertionMode::AfterHead;
                Ok(Flow::Reprocess(Tok::Char(rest)))
            }
            Tok::Comment(text) => {
                self.append_comment(text)?;
                Ok(Flow::Done)
            }
            Tok::Doctype { .. } => {
                self.parse_error(ctx, ParseErrorCode::MisplacedDoctype, "late doctype");
                Ok(Flow::Done)
            }
            Tok::Start(view) => match view.etype {
                ElementType::Html => self.mode_in_body(Tok::Start(view), ctx),
                ElementType::Base
                | ElementType::Basefont
                | ElementType::Bgsound
                | ElementType::Link
                | ElementType::Meta => {
                    self.insert_element_no_push(Namespace::Html, view.name, &view.attrs)?;
                    Ok(Flow::Done)
                }
                ElementType::Title => {
                    self.parse_generic(&view, ContentModel::Rcdata)?;
                    Ok(Flow::Done)
                }
                ElementType::Style | ElementType::Script => {
                    self.parse_generic(&view, ContentModel::Cdata)?;
                    Ok(Flow::Done)
                }
                ElementType::Noscript => {
                    if self.config.scripting_enabled {
                        self.parse_generic(&view, ContentModel::Cdata)?;
                    } else {
                        self.insert_from_view(&view)?;
                        self.mode = InsertionMode::InHeadNoscript;
                    }
                    Ok(Flow::Done)
                }
                ElementType::Head => {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedStartTag, "nested head");
                    Ok(Flow::Done)
                }
                _ => {
                    self.pop_and_unref();
                    self.mode = InsertionMode::AfterHead;
                    Ok(Flow::Reprocess(Tok::Start(view)))
                }
            },
            Tok::End(view) => match view.etype {
                ElementType::Head => {
                    self.pop_and_unref();
                    self.mode = InsertionMode::AfterHead;
                    Ok(Flow::Done)
                }
                ElementType::Body | ElementType::Html | ElementType::Br => {
                    self.pop_and_unref();
                    self.mode = InsertionMode::AfterHead;
                    Ok(Flow::Reprocess(Tok::End(view)))
                }
                _ => {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "end tag in head");
                    Ok(Flow::Done)
                }
            },
            Tok::Eof => {
                self.pop_and_unref();
                self.mode = InsertionMode::AfterHead;
                Ok(Flow::Reprocess(Tok::Eof))
            }
        }
    }

    pub(crate) fn mode_in_head_noscript<'a>(
        &mut self,
        tok: Tok<'a>,
        ctx: &mut DocumentParseContext,
    ) -> ModeResult<'a> {
        match tok {
            Tok::Char(text) => {
                let (ws, rest) = Self::split_leading_ws(text);
                self.append_text(ws)?;
                if rest.is_empty() {
                    return Ok(Flow::Done);
                }
                self.parse_error(ctx, ParseErrorCode::UnexpectedCharacters, "text in noscript");
                self.pop_and_unref();
                self.mode = InsertionMode::InHead;
                Ok(Flow::Reprocess(Tok::Char(rest)))
            }
            Tok::Comment(text) => {
                self.append_comment(text)?;
                Ok(Flow::Done)
            }
            Tok::Doctype { .. } => {
                self.parse_error(ctx, ParseErrorCode::MisplacedDoctype, "late doctype");
                Ok(Flow::Done)
            }
            Tok::Start(view) => match view.etype {
                ElementType::Html => self.mode_in_body(Tok::Start(view), ctx),
                ElementType::Base
                | ElementType::Basefont
                | ElementType::Bgsound
                | ElementType::Link
                | ElementType::Meta
                | ElementType::Style => self.mode_in_head(Tok::Start(view), ctx),
                ElementType::Head | ElementType::Noscript => {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedStartTag, "tag in noscript");
                    Ok(Flow::Done)
                }
                _ => {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedStartTag, "tag in noscript");
                    self.pop_and_unref();
                    self.mode = InsertionMode::InHead;
                    Ok(Flow::Reprocess(Tok::Start(view)))
                }
            },
            Tok::End(view) => match view.etype {
                ElementType::Noscript => {
                    self.pop_and_unref();
                    self.mode = InsertionMode::InHead;
                    Ok(Flow::Done)
                }
                ElementType::Br => {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "br in noscript");
                    self.pop_and_unref();
                    self.mode = InsertionMode::InHead;
                    Ok(Flow::Reprocess(Tok::End(view)))
                }
                _ => {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "end tag in noscript");
                    Ok(Flow::Done)
                }
            },
            Tok::Eof => {
                self.pop_and_unref();
                self.mode = InsertionMode::InHead;
                Ok(Flow::Reprocess(Tok::Eof))
            }
        }
    }

    pub(crate) fn mode_after_head<'a>(
        &mut self,
        tok: Tok<'a>,
        ctx: &mut DocumentParseContext,
    ) -> ModeResult<'a> {
        match tok {
            Tok::Char(text) => {
                let (ws, rest) = Self::split_leading_ws(text);
                self.append_text(ws)?;
                if rest.is_empty() {
                    return Ok(Flow::Done);
                }
                self.open_body(&[])?;
                Ok(Flow::Reprocess(Tok::Char(rest)))
            }
            Tok::Comment(text) => {
                self.append_comment(text)?;
                Ok(Flow::Done)
            }
            Tok::Doctype { .. } => {
                self.parse_error(ctx, ParseErrorCode::MisplacedDoctype, "late doctype");
                Ok(Flow::Done)
            }
            Tok::Start(view) => match view.etype {
                ElementType::Html => self.mode_in_body(Tok::Start(view), ctx),
                ElementType::Body => {
                    self.insert_from_view(&view)?;
                    self.mode = InsertionMode::InBody;
                    Ok(Flow::Done)
                }
                ElementType::Frameset => {
                    self.insert_from_view(&view)?;
                    self.mode = InsertionMode::InFrameset;
                    Ok(Flow::Done)
                }
                ElementType::Base
                | ElementType::Basefont
                | ElementType::Bgsound
                | ElementType::Link
                | ElementType::Meta
                | ElementType::Script
                | ElementType::Style
                | ElementType::Title => {
                    self.parse_error(
                        ctx,
                        ParseErrorCode::UnexpectedStartTag,
                        "metadata after head",
                    );
                    let Some(head) = self.head_element.clone() else {
                        self.open_body(&[])?;
                        return Ok(Flow::Reprocess(Tok::Start(view)));
                    };
                    // Re-open the head for the stray metadata, then take it
                    // back off the stack.
                    self.handler.ref_node(&head);
                    self.stack.push(OpenElement {
                        ns: Namespace::Html,
                        etype: ElementType::Head,
                        node: head.clone(),
                    });
                    let flow = self.mode_in_head(Tok::Start(view), ctx)?;
                    self.stack_remove_node(&head);
                    Ok(flow)
                }
                _ => {
                    self.open_body(&[])?;
                    Ok(Flow::Reprocess(Tok::Start(view)))
                }
            },
            Tok::End(view) => {
                self.open_body(&[])?;
                Ok(Flow::Reprocess(Tok::End(view)))
            }
            Tok::Eof => {
                self.open_body(&[])?;
                Ok(Flow::Reprocess(Tok::Eof))
            }
        }
    }

    fn open_body(&mut self, attrs: &[AttrView<'_>]) -> Result<(), TreeBuilderError> {
        self.insert_element(Namespace::Html, ElementType::Body, b"body", attrs)?;
        self.mode = InsertionMode::InBody;
        Ok(())
    }

    pub(crate) fn mode_in_body<'a>(
        &mut self,
        tok: Tok<'a>,
        ctx: &mut DocumentParseContext,
    ) -> ModeResult<'a> {
        match tok {
            Tok::Char(text) => {
                self.reconstruct_formatting()?;
                self.append_text(text)?;
                Ok(Flow::Done)
            }
            Tok::Comment(text) => {
                self.append_comment(text)?;
                Ok(Flow::Done)
            }
            Tok::Doctype { .. } => {
                self.parse_error(ctx, ParseErrorCode::MisplacedDoctype, "late doctype");
                Ok(Flow::Done)
            }
            Tok::Start(view) => self.in_body_start(view, ctx),
            Tok::End(view) => self.in_body_end(view, ctx),
            Tok::Eof => {
                let unclosed = self.stack.iter().any(|entry| {
                    !matches!(
                        entry.etype,
                        ElementType::Dd
                            | ElementType::Dt
                            | ElementType::Li
                            | ElementType::P
                            | ElementType::Tbody
                            | ElementType::Td
                            | ElementType::Tfoot
                            | ElementType::Th
                            | ElementType::Thead
                            | ElementType::Tr
                            | ElementType::Body
                            | ElementType::Html
                    )
                });
                if unclosed {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedEof, "unclosed element");
                }
                Ok(Flow::Done)
            }
        }
    }

    fn in_body_start<'a>(
        &mut self,
        view: TagView<'a>,
        ctx: &mut DocumentParseContext,
    ) -> ModeResult<'a> {
        use ElementType::*;
        match view.etype {
            Html => {
                self.parse_error(ctx, ParseErrorCode::UnexpectedStartTag, "repeated html");
                let root = self
                    .stack
                    .get(0)
                    .expect("document element exists in body")
                    .node
                    .clone();
                self.add_missing_attributes(&root, &view.attrs)?;
                Ok(Flow::Done)
            }
            Base | Basefont | Bgsound | Link | Meta | Script | Style | Title => {
                self.mode_in_head(Tok::Start(view), ctx)
            }
            Body => {
                self.parse_error(ctx, ParseErrorCode::UnexpectedStartTag, "repeated body");
                if let Some(body) = self
                    .stack
                    .get(1)
                    .filter(|e| e.etype == Body)
                    .map(|e| e.node.clone())
                {
                    self.add_missing_attributes(&body, &view.attrs)?;
                }
                Ok(Flow::Done)
            }
            Address | Blockquote | Center | Dir | Div | Dl | Fieldset | Menu | Ol | Ul => {
                self.close_p_if_in_scope(ctx);
                self.insert_from_view(&view)?;
                Ok(Flow::Done)
            }
            Pre | Listing => {
                self.close_p_if_in_scope(ctx);
                self.insert_from_view(&view)?;
                self.strip_leading_lr = true;
                Ok(Flow::Done)
            }
            Form => {
                if self.form_element.is_some() {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedStartTag, "nested form");
                    return Ok(Flow::Done);
                }
                self.close_p_if_in_scope(ctx);
                let node = self.insert_from_view(&view)?;
                self.handler.ref_node(&node);
                self.form_element = Some(node);
                Ok(Flow::Done)
            }
            Li => {
                self.close_list_item(&[Li], ctx);
                self.close_p_if_in_scope(ctx);
                self.insert_from_view(&view)?;
                Ok(Flow::Done)
            }
            Dd | Dt => {
                self.close_list_item(&[Dd, Dt], ctx);
                self.close_p_if_in_scope(ctx);
                self.insert_from_view(&view)?;
                Ok(Flow::Done)
            }
            Plaintext => {
                self.close_p_if_in_scope(ctx);
                self.insert_from_view(&view)?;
                self.pending_content_model = Some(ContentModel::Plaintext);
                Ok(Flow::Done)
            }
            H1 | H2 | H3 | H4 | H5 | H6 => {
                self.close_p_if_in_scope(ctx);
                if self.current_type().is_heading() {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedStartTag, "nested heading");
                    self.pop_and_unref();
                }
                self.insert_from_view(&view)?;
                Ok(Flow::Done)
            }
            A => {
                if self.formatting.last_match_after_marker(A).is_some() {
                    self.parse_error(ctx, ParseErrorCode::MisnestedFormatting, "nested a");
                    self.adoption_agency(A, ctx)?;
                    if let Some(idx) = self.formatting.last_match_after_marker(A) {
                        if let super::formatting::FormattingEntry::Element(el) =
                            self.formatting.remove(idx)
                        {
                            if let Some(si) = self.stack.position_of_node(&el.node) {
                                let removed = self.stack.remove(si);
                                self.handler.unref_node(&removed.node);
                            }
                            self.handler.unref_node(&el.node);
                        }
                    }
                }
                self.reconstruct_formatting()?;
                let snapshot = snapshot_of(&view);
                let node = self.insert_from_view(&view)?;
                self.push_formatting_element(A, node, snapshot);
                Ok(Flow::Done)
            }
            B | Big | Code | Em | Font | I | S | Small | Strike | Strong | Tt | U => {
                self.reconstruct_formatting()?;
                let snapshot = snapshot_of(&view);
                let node = self.insert_from_view(&view)?;
                self.push_formatting_element(view.etype, node, snapshot);
                Ok(Flow::Done)
            }
            Nobr => {
                self.reconstruct_formatting()?;
                if self.stack.in_scope(Nobr, ScopeKind::Default) {
                    self.parse_error(ctx, ParseErrorCode::MisnestedFormatting, "nested nobr");
                    self.adoption_agency(Nobr, ctx)?;
                    self.reconstruct_formatting()?;
                }
                let snapshot = snapshot_of(&view);
                let node = self.insert_from_view(&view)?;
                self.push_formatting_element(Nobr, node, snapshot);
                Ok(Flow::Done)
            }
            Button => {
                if self.stack.in_scope(Button, ScopeKind::Default) {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedStartTag, "nested button");
                    self.generate_implied_end_tags(None);
                    self.pop_until(Button);
                    self.clear_formatting_to_marker();
                }
                self.reconstruct_formatting()?;
                self.insert_from_view(&view)?;
                self.formatting.push_marker();
                Ok(Flow::Done)
            }
            Applet | Marquee | Object => {
                self.reconstruct_formatting()?;
                self.insert_from_view(&view)?;
                self.formatting.push_marker();
                Ok(Flow::Done)
            }
            Xmp => {
                self.reconstruct_formatting()?;
                self.parse_generic(&view, ContentModel::Cdata)?;
                Ok(Flow::Done)
            }
            Table => {
                if !self.quirks {
                    self.close_p_if_in_scope(ctx);
                }
                self.insert_from_view(&view)?;
                self.mode = InsertionMode::InTable;
                Ok(Flow::Done)
            }
            Area | Br | Embed | Img | Param | Spacer | Wbr => {
                self.reconstruct_formatting()?;
                self.insert_element_no_push(Namespace::Html, view.name, &view.attrs)?;
                Ok(Flow::Done)
            }
            Hr => {
                self.close_p_if_in_scope(ctx);
                self.insert_element_no_push(Namespace::Html, view.name, &view.attrs)?;
                Ok(Flow::Done)
            }
            Image => {
                // Don't ask.
                self.parse_error(ctx, ParseErrorCode::UnexpectedStartTag, "image for img");
                self.reconstruct_formatting()?;
                self.insert_element_no_push(Namespace::Html, b"img", &view.attrs)?;
                Ok(Flow::Done)
            }
            Input => {
                self.reconstruct_formatting()?;
                let node = self.insert_element_no_push(Namespace::Html, view.name, &view.attrs)?;
                let form = self.form_element.clone();
                self.handler.associate_form(form.as_ref(), &node)?;
                Ok(Flow::Done)
            }
            Textarea => {
                self.parse_generic(&view, ContentModel::Rcdata)?;
                self.strip_leading_lr = true;
                Ok(Flow::Done)
            }
            Iframe | Noembed | Noframes => {
                self.parse_generic(&view, ContentModel::Cdata)?;
                Ok(Flow::Done)
            }
            Noscript if self.config.scripting_enabled => {
                self.parse_generic(&view, ContentModel::Cdata)?;
                Ok(Flow::Done)
            }
            Select => {
                self.reconstruct_formatting()?;
                self.insert_from_view(&view)?;
                self.mode = if matches!(
                    self.mode,
                    InsertionMode::InTable
                        | InsertionMode::InCaption
                        | InsertionMode::InColumnGroup
                        | InsertionMode::InTableBody
                        | InsertionMode::InRow
                        | InsertionMode::InCell
                ) {
                    InsertionMode::InSelectInTable
                } else {
                    InsertionMode::InSelect
                };
                Ok(Flow::Done)
            }
            Optgroup | Option => {
                if self.current_type() == Option {
                    self.pop_and_unref();
                }
                self.reconstruct_formatting()?;
                self.insert_from_view(&view)?;
                Ok(Flow::Done)
            }
            Math => {
                self.enter_foreign(view, Namespace::MathMl)?;
                Ok(Flow::Done)
            }
            Svg => {
                self.enter_foreign(view, Namespace::Svg)?;
                Ok(Flow::Done)
            }
            Caption | Col | Colgroup | Frame | Frameset | Head | Tbody | Td | Tfoot | Th
            | Thead | Tr => {
                self.parse_error(ctx, ParseErrorCode::UnexpectedStartTag, "misplaced tag");
                Ok(Flow::Done)
            }
            _ => {
                self.reconstruct_formatting()?;
                self.insert_from_view(&view)?;
                Ok(Flow::Done)
            }
        }
    }

    /// The list-item closure loop shared by `li`, `dd`, and `dt`.
    fn close_list_item(&mut self, targets: &[ElementType], ctx: &mut DocumentParseContext) {
        for i in (0..self.stack.len()).rev() {
            let etype = self.stack.get(i).expect("indexed entry").etype;
            if targets.contains(&etype) {
                self.generate_implied_end_tags(Some(etype));
                if self.current_type() != etype {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedStartTag, "misnested list item");
                }
                self.pop_until(etype);
                return;
            }
            if etype.is_special_or_scoping()
                && !matches!(etype, ElementType::Address | ElementType::Div | ElementType::P)
            {
                return;
            }
        }
    }

    fn enter_foreign(
        &mut self,
        mut view: TagView<'_>,
        ns: Namespace,
    ) -> Result<(), TreeBuilderError> {
        self.reconstruct_formatting()?;
        adjust_foreign_attributes(&mut view.attrs);
        if view.self_closing {
            self.insert_element_no_push(ns, view.name, &view.attrs)?;
        } else {
            self.insert_element(ns, view.etype, view.name, &view.attrs)?;
            self.second_mode = self.mode;
            self.mode = InsertionMode::InForeignContent;
        }
        Ok(())
    }

    fn in_body_end<'a>(
        &mut self,
        view: TagView<'a>,
        ctx: &mut DocumentParseContext,
    ) -> ModeResult<'a> {
        use ElementType::*;
        match view.etype {
            Body => {
                if !self.stack.in_scope(Body, ScopeKind::Default) {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "stray body end");
                    return Ok(Flow::Done);
                }
                self.mode = InsertionMode::AfterBody;
                Ok(Flow::Done)
            }
            Html => {
                if !self.stack.in_scope(Body, ScopeKind::Default) {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "stray html end");
                    return Ok(Flow::Done);
                }
                self.mode = InsertionMode::AfterBody;
                Ok(Flow::Reprocess(Tok::End(view)))
            }
            Address | Blockquote | Center | Dir | Div | Dl | Fieldset | Listing | Menu | Ol
            | Pre | Ul => {
                if self.stack.in_scope(view.etype, ScopeKind::Default) {
                    self.generate_implied_end_tags(None);
                    if self.current_type() != view.etype {
                        self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "misnested block");
                    }
                    self.pop_until(view.etype);
                } else {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "stray block end");
                }
                Ok(Flow::Done)
            }
            Form => {
                let Some(form) = self.form_element.take() else {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "stray form end");
                    return Ok(Flow::Done);
                };
                self.generate_implied_end_tags(None);
                if self
                    .stack
                    .current()
                    .map(|e| e.node == form)
                    .unwrap_or(false)
                {
                    self.pop_and_unref();
                } else {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "misnested form");
                }
                self.handler.unref_node(&form);
                Ok(Flow::Done)
            }
            P => {
                if self.stack.in_scope(P, ScopeKind::Default) {
                    self.generate_implied_end_tags(Some(P));
                    if self.current_type() != P {
                        self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "misnested p");
                    }
                    self.pop_until(P);
                } else {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "stray p end");
                    self.insert_element(Namespace::Html, P, b"p", &[])?;
                    self.pop_and_unref();
                }
                Ok(Flow::Done)
            }
            Dd | Dt | Li => {
                let kind = if view.etype == Li {
                    ScopeKind::ListItem
                } else {
                    ScopeKind::Default
                };
                if self.stack.in_scope(view.etype, kind) {
                    self.generate_implied_end_tags(Some(view.etype));
                    if self.current_type() != view.etype {
                        self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "misnested item");
                    }
                    self.pop_until(view.etype);
                } else {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "stray item end");
                }
                Ok(Flow::Done)
            }
            H1 | H2 | H3 | H4 | H5 | H6 => {
                const HEADINGS: [ElementType; 6] = [H1, H2, H3, H4, H5, H6];
                if self.stack.any_in_scope(&HEADINGS, ScopeKind::Default) {
                    self.generate_implied_end_tags(None);
                    if self.current_type() != view.etype {
                        self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "misnested heading");
                    }
                    self.pop_until_any(&HEADINGS);
                } else {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "stray heading end");
                }
                Ok(Flow::Done)
            }
            A | B | Big | Code | Em | Font | I | Nobr | S | Small | Strike | Strong | Tt | U => {
                self.adoption_agency(view.etype, ctx)?;
                Ok(Flow::Done)
            }
            Applet | Button | Marquee | Object => {
                if self.stack.in_scope(view.etype, ScopeKind::Default) {
                    self.generate_implied_end_tags(None);
                    if self.current_type() != view.etype {
                        self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "misnested scope");
                    }
                    self.pop_until(view.etype);
                    self.clear_formatting_to_marker();
                } else {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "stray end tag");
                }
                Ok(Flow::Done)
            }
            Br => {
                self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "br end tag");
                self.reconstruct_formatting()?;
                self.insert_element_no_push(Namespace::Html, b"br", &[])?;
                Ok(Flow::Done)
            }
            _ => {
                self.any_other_end_tag(view.etype, ctx);
                Ok(Flow::Done)
            }
        }
    }

    /// Generic raw-text collection: the tokenizer only delivers characters
    /// and the matching end tag while the content model is CDATA/RCDATA.
    pub(crate) fn mode_in_cdata_rcdata<'a>(
        &mut self,
        tok: Tok<'a>,
        ctx: &mut DocumentParseContext,
    ) -> ModeResult<'a> {
        match tok {
            Tok::Char(text) => {
                self.append_text(text)?;
                Ok(Flow::Done)
            }
            Tok::End(_) => {
                self.pop_and_unref();
                self.mode = self.cdata_return_mode;
                Ok(Flow::Done)
            }
            Tok::Eof => {
                self.parse_error(ctx, ParseErrorCode::UnexpectedEof, "eof in raw text");
                self.pop_and_unref();
                self.mode = self.cdata_return_mode;
                Ok(Flow::Reprocess(Tok::Eof))
            }
            other => {
                self.pop_and_unref();
                self.mode = self.cdata_return_mode;
                Ok(Flow::Reprocess(other))
            }
        }
    }

    pub(crate) fn mode_in_table<'a>(
        &mut self,
        tok: Tok<'a>,
        ctx: &mut DocumentParseContext,
    ) -> ModeResult<'a> {
        use ElementType::*;
        match tok {
            Tok::Char(text) if Self::is_all_ws(text) => {
                self.append_text(text)?;
                Ok(Flow::Done)
            }
            Tok::Char(_) => {
                self.parse_error(ctx, ParseErrorCode::MisplacedTableContent, "text in table");
                self.foster_in_body(tok, ctx)
            }
            Tok::Comment(text) => {
                self.append_comment(text)?;
                Ok(Flow::Done)
            }
            Tok::Doctype { .. } => {
                self.parse_error(ctx, ParseErrorCode::MisplacedDoctype, "late doctype");
                Ok(Flow::Done)
            }
            Tok::Start(view) => match view.etype {
                Caption => {
                    self.clear_stack_to_context(&[Table]);
                    self.formatting.push_marker();
                    self.insert_from_view(&view)?;
                    self.mode = InsertionMode::InCaption;
                    Ok(Flow::Done)
                }
                Colgroup => {
                    self.clear_stack_to_context(&[Table]);
                    self.insert_from_view(&view)?;
                    self.mode = InsertionMode::InColumnGroup;
                    Ok(Flow::Done)
                }
                Col => {
                    self.clear_stack_to_context(&[Table]);
                    self.insert_element(Namespace::Html, Colgroup, b"colgroup", &[])?;
                    self.mode = InsertionMode::InColumnGroup;
                    Ok(Flow::Reprocess(Tok::Start(view)))
                }
                Tbody | Tfoot | Thead => {
                    self.clear_stack_to_context(&[Table]);
                    self.insert_from_view(&view)?;
                    self.mode = InsertionMode::InTableBody;
                    Ok(Flow::Done)
                }
                Td | Th | Tr => {
                    self.clear_stack_to_context(&[Table]);
                    self.insert_element(Namespace::Html, Tbody, b"tbody", &[])?;
                    self.mode = InsertionMode::InTableBody;
                    Ok(Flow::Reprocess(Tok::Start(view)))
                }
                Table => {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedStartTag, "nested table");
                    if self.stack.in_scope(Table, ScopeKind::Table) {
                        self.pop_until(Table);
                        self.reset_insertion_mode();
                        Ok(Flow::Reprocess(Tok::Start(view)))
                    } else {
                        Ok(Flow::Done)
                    }
                }
                Style | Script => self.mode_in_head(Tok::Start(view), ctx),
                Input if has_hidden_type(&view.attrs) => {
                    self.parse_error(ctx, ParseErrorCode::MisplacedTableContent, "input in table");
                    self.insert_element_no_push(Namespace::Html, view.name, &view.attrs)?;
                    Ok(Flow::Done)
                }
                Form => {
                    self.parse_error(ctx, ParseErrorCode::MisplacedTableContent, "form in table");
                    if self.form_element.is_none() {
                        let node =
                            self.insert_element_no_push(Namespace::Html, view.name, &view.attrs)?;
                        self.handler.ref_node(&node);
                        self.form_element = Some(node);
                    }
                    Ok(Flow::Done)
                }
                _ => {
                    self.parse_error(ctx, ParseErrorCode::MisplacedTableContent, "tag in table");
                    self.foster_in_body(Tok::Start(view), ctx)
                }
            },
            Tok::End(view) => match view.etype {
                Table => {
                    if self.stack.in_scope(Table, ScopeKind::Table) {
                        self.pop_until(Table);
                        self.reset_insertion_mode();
                    } else {
                        self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "stray table end");
                    }
                    Ok(Flow::Done)
                }
                Body | Caption | Col | Colgroup | Html | Tbody | Td | Tfoot | Th | Thead | Tr => {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "end tag in table");
                    Ok(Flow::Done)
                }
                _ => {
                    self.parse_error(ctx, ParseErrorCode::MisplacedTableContent, "tag in table");
                    self.foster_in_body(Tok::End(view), ctx)
                }
            },
            Tok::Eof => {
                if self.current_type() != Html {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedEof, "eof in table");
                }
                Ok(Flow::Done)
            }
        }
    }

    fn foster_in_body<'a>(&mut self, tok: Tok<'a>, ctx: &mut DocumentParseContext) -> ModeResult<'a> {
        self.in_table_foster = true;
        let flow = self.mode_in_body(tok, ctx);
        self.in_table_foster = false;
        flow
    }

    fn clear_stack_to_context(&mut self, allowed: &[ElementType]) {
        while let Some(t) = self.stack.current_type() {
            if allowed.contains(&t) || t == ElementType::Html {
                break;
            }
            self.pop_and_unref();
        }
    }

    pub(crate) fn mode_in_caption<'a>(
        &mut self,
        tok: Tok<'a>,
        ctx: &mut DocumentParseContext,
    ) -> ModeResult<'a> {
        use ElementType::*;
        match tok {
            Tok::Start(view)
                if matches!(
                    view.etype,
                    Caption | Col | Colgroup | Tbody | Td | Tfoot | Th | Thead | Tr
                ) =>
            {
                self.parse_error(ctx, ParseErrorCode::MisplacedTableContent, "tag in caption");
                if self.stack.in_scope(Caption, ScopeKind::Table) {
                    self.close_caption(ctx);
                    Ok(Flow::Reprocess(Tok::Start(view)))
                } else {
                    Ok(Flow::Done)
                }
            }
            Tok::End(view) => match view.etype {
                Caption => {
                    if self.stack.in_scope(Caption, ScopeKind::Table) {
                        self.close_caption(ctx);
                    } else {
                        self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "stray caption end");
                    }
                    Ok(Flow::Done)
                }
                Table => {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "table end in caption");
                    if self.stack.in_scope(Caption, ScopeKind::Table) {
                        self.close_caption(ctx);
                        Ok(Flow::Reprocess(Tok::End(view)))
                    } else {
                        Ok(Flow::Done)
                    }
                }
                Body | Col | Colgroup | Html | Tbody | Td | Tfoot | Th | Thead | Tr => {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "end tag in caption");
                    Ok(Flow::Done)
                }
                _ => self.mode_in_body(Tok::End(view), ctx),
            },
            other => self.mode_in_body(other, ctx),
        }
    }

    fn close_caption(&mut self, ctx: &mut DocumentParseContext) {
        self.generate_implied_end_tags(None);
        if self.current_type() != ElementType::Caption {
            self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "unclosed in caption");
        }
        self.pop_until(ElementType::Caption);
        self.clear_formatting_to_marker();
        self.mode = InsertionMode::InTable;
    }

    pub(crate) fn mode_in_column_group<'a>(
        &mut self,
        tok: Tok<'a>,
        ctx: &mut DocumentParseContext,
    ) -> ModeResult<'a> {
        use ElementType::*;
        match tok {
            Tok::Char(text) => {
                let (ws, rest) = Self::split_leading_ws(text);
                self.append_text(ws)?;
                if rest.is_empty() {
                    return Ok(Flow::Done);
                }
                if self.current_type() == Html {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedCharacters, "stray text");
                    return Ok(Flow::Done);
                }
                self.pop_and_unref();
                self.mode = InsertionMode::InTable;
                Ok(Flow::Reprocess(Tok::Char(rest)))
            }
            Tok::Comment(text) => {
                self.append_comment(text)?;
                Ok(Flow::Done)
            }
            Tok::Doctype { .. } => {
                self.parse_error(ctx, ParseErrorCode::MisplacedDoctype, "late doctype");
                Ok(Flow::Done)
            }
            Tok::Start(view) => match view.etype {
                Html => self.mode_in_body(Tok::Start(view), ctx),
                Col => {
                    self.insert_element_no_push(Namespace::Html, view.name, &view.attrs)?;
                    Ok(Flow::Done)
                }
                _ => {
                    if self.current_type() == Html {
                        self.parse_error(ctx, ParseErrorCode::UnexpectedStartTag, "stray tag");
                        return Ok(Flow::Done);
                    }
                    self.pop_and_unref();
                    self.mode = InsertionMode::InTable;
                    Ok(Flow::Reprocess(Tok::Start(view)))
                }
            },
            Tok::End(view) => match view.etype {
                Colgroup => {
                    if self.current_type() == Html {
                        self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "stray colgroup");
                    } else {
                        self.pop_and_unref();
                        self.mode = InsertionMode::InTable;
                    }
                    Ok(Flow::Done)
                }
                Col => {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "col end tag");
                    Ok(Flow::Done)
                }
                _ => {
                    if self.current_type() == Html {
                        self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "stray end tag");
                        return Ok(Flow::Done);
                    }
                    self.pop_and_unref();
                    self.mode = InsertionMode::InTable;
                    Ok(Flow::Reprocess(Tok::End(view)))
                }
            },
            Tok::Eof => {
                if self.current_type() == Html {
                    return Ok(Flow::Done);
                }
                self.pop_and_unref();
                self.mode = InsertionMode::InTable;
                Ok(Flow::Reprocess(Tok::Eof))
            }
        }
    }

    pub(crate) fn mode_in_table_body<'a>(
        &mut self,
        tok: Tok<'a>,
        ctx: &mut DocumentParseContext,
    ) -> ModeResult<'a> {
        use ElementType::*;
        const SECTIONS: [ElementType; 3] = [Tbody, Tfoot, Thead];
        match tok {
            Tok::Start(view) => match view.etype {
                Tr => {
                    self.clear_stack_to_context(&SECTIONS);
                    self.insert_from_view(&view)?;
                    self.mode = InsertionMode::InRow;
                    Ok(Flow::Done)
                }
                Td | Th => {
                    self.parse_error(ctx, ParseErrorCode::MisplacedTableContent, "cell without tr");
                    self.clear_stack_to_context(&SECTIONS);
                    self.insert_element(Namespace::Html, Tr, b"tr", &[])?;
                    self.mode = InsertionMode::InRow;
                    Ok(Flow::Reprocess(Tok::Start(view)))
                }
                Caption | Col | Colgroup | Tbody | Tfoot | Thead => {
                    if self.stack.any_in_scope(&SECTIONS, ScopeKind::Table) {
                        self.clear_stack_to_context(&SECTIONS);
                        self.pop_and_unref();
                        self.mode = InsertionMode::InTable;
                        Ok(Flow::Reprocess(Tok::Start(view)))
                    } else {
                        self.parse_error(ctx, ParseErrorCode::MisplacedTableContent, "stray tag");
                        Ok(Flow::Done)
                    }
                }
                _ => self.mode_in_table(Tok::Start(view), ctx),
            },
            Tok::End(view) => match view.etype {
                Tbody | Tfoot | Thead => {
                    if self.stack.in_scope(view.etype, ScopeKind::Table) {
                        self.clear_stack_to_context(&SECTIONS);
                        self.pop_and_unref();
                        self.mode = InsertionMode::InTable;
                    } else {
                        self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "stray section");
                    }
                    Ok(Flow::Done)
                }
                Table => {
                    if self.stack.any_in_scope(&SECTIONS, ScopeKind::Table) {
                        self.clear_stack_to_context(&SECTIONS);
                        self.pop_and_unref();
                        self.mode = InsertionMode::InTable;
                        Ok(Flow::Reprocess(Tok::End(view)))
                    } else {
                        self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "stray table end");
                        Ok(Flow::Done)
                    }
                }
                Body | Caption | Col | Colgroup | Html | Td | Th | Tr => {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "end tag in sections");
                    Ok(Flow::Done)
                }
                _ => self.mode_in_table(Tok::End(view), ctx),
            },
            other => self.mode_in_table(other, ctx),
        }
    }

    pub(crate) fn mode_in_row<'a>(
        &mut self,
        tok: Tok<'a>,
        ctx: &mut DocumentParseContext,
    ) -> ModeResult<'a> {
        use ElementType::*;
        match tok {
            Tok::Start(view) => match view.etype {
                Td | Th => {
                    self.clear_stack_to_context(&[Tr]);
                    self.insert_from_view(&view)?;
                    self.mode = InsertionMode::InCell;
                    self.formatting.push_marker();
                    Ok(Flow::Done)
                }
                Caption | Col | Colgroup | Tbody | Tfoot | Thead | Tr => {
                    if self.stack.in_scope(Tr, ScopeKind::Table) {
                        self.close_row();
                        Ok(Flow::Reprocess(Tok::Start(view)))
                    } else {
                        self.parse_error(ctx, ParseErrorCode::MisplacedTableContent, "stray tag");
                        Ok(Flow::Done)
                    }
                }
                _ => self.mode_in_table(Tok::Start(view), ctx),
            },
            Tok::End(view) => match view.etype {
                Tr => {
                    if self.stack.in_scope(Tr, ScopeKind::Table) {
                        self.close_row();
                    } else {
                        self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "stray tr end");
                    }
                    Ok(Flow::Done)
                }
                Table => {
                    if self.stack.in_scope(Tr, ScopeKind::Table) {
                        self.close_row();
                        Ok(Flow::Reprocess(Tok::End(view)))
                    } else {
                        self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "stray table end");
                        Ok(Flow::Done)
                    }
                }
                Tbody | Tfoot | Thead => {
                    if self.stack.in_scope(view.etype, ScopeKind::Table) {
                        if self.stack.in_scope(Tr, ScopeKind::Table) {
                            self.close_row();
                        }
                        Ok(Flow::Reprocess(Tok::End(view)))
                    } else {
                        self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "stray section");
                        Ok(Flow::Done)
                    }
                }
                Body | Caption | Col | Colgroup | Html | Td | Th => {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "end tag in row");
                    Ok(Flow::Done)
                }
                _ => self.mode_in_table(Tok::End(view), ctx),
            },
            other => self.mode_in_table(other, ctx),
        }
    }

    fn close_row(&mut self) {
        self.clear_stack_to_context(&[ElementType::Tr]);
        self.pop_and_unref();
        self.mode = InsertionMode::InTableBody;
    }

    pub(crate) fn mode_in_cell<'a>(
        &mut self,
        tok: Tok<'a>,
        ctx: &mut DocumentParseContext,
    ) -> ModeResult<'a> {
        use ElementType::*;
        match tok {
            Tok::Start(view)
                if matches!(
                    view.etype,
                    Caption | Col | Colgroup | Tbody | Td | Tfoot | Th | Thead | Tr
                ) =>
            {
                if self.stack.in_scope(Td, ScopeKind::Table)
                    || self.stack.in_scope(Th, ScopeKind::Table)
                {
                    self.close_cell(ctx);
                    Ok(Flow::Reprocess(Tok::Start(view)))
                } else {
                    self.parse_error(ctx, ParseErrorCode::MisplacedTableContent, "cell missing");
                    Ok(Flow::Done)
                }
            }
            Tok::End(view) => match view.etype {
                Td | Th => {
                    if self.stack.in_scope(view.etype, ScopeKind::Table) {
                        self.end_cell(view.etype, ctx);
                    } else {
                        self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "stray cell end");
                    }
                    Ok(Flow::Done)
                }
                Body | Caption | Col | Colgroup | Html => {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "end tag in cell");
                    Ok(Flow::Done)
                }
                Table | Tbody | Tfoot | Thead | Tr => {
                    if self.stack.in_scope(view.etype, ScopeKind::Table) {
                        self.close_cell(ctx);
                        Ok(Flow::Reprocess(Tok::End(view)))
                    } else {
                        self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "stray end tag");
                        Ok(Flow::Done)
                    }
                }
                _ => self.mode_in_body(Tok::End(view), ctx),
            },
            other => self.mode_in_body(other, ctx),
        }
    }

    fn close_cell(&mut self, ctx: &mut DocumentParseContext) {
        if self.stack.in_scope(ElementType::Td, ScopeKind::Table) {
            self.end_cell(ElementType::Td, ctx);
        } else if self.stack.in_scope(ElementType::Th, ScopeKind::Table) {
            self.end_cell(ElementType::Th, ctx);
        }
    }

    fn end_cell(&mut self, etype: ElementType, ctx: &mut DocumentParseContext) {
        self.generate_implied_end_tags(None);
        if self.current_type() != etype {
            self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "unclosed in cell");
        }
        self.pop_until(etype);
        self.clear_formatting_to_marker();
        self.mode = InsertionMode::InRow;
    }

    pub(crate) fn mode_in_select<'a>(
        &mut self,
        tok: Tok<'a>,
        ctx: &mut DocumentParseContext,
    ) -> ModeResult<'a> {
        use ElementType::*;
        match tok {
            Tok::Char(text) => {
                self.append_text(text)?;
                Ok(Flow::Done)
            }
            Tok::Comment(text) => {
                self.append_comment(text)?;
                Ok(Flow::Done)
            }
            Tok::Doctype { .. } => {
                self.parse_error(ctx, ParseErrorCode::MisplacedDoctype, "late doctype");
                Ok(Flow::Done)
            }
            Tok::Start(view) => match view.etype {
                Html => self.mode_in_body(Tok::Start(view), ctx),
                Option => {
                    if self.current_type() == Option {
                        self.pop_and_unref();
                    }
                    self.insert_from_view(&view)?;
                    Ok(Flow::Done)
                }
                Optgroup => {
                    if self.current_type() == Option {
                        self.pop_and_unref();
                    }
                    if self.current_type() == Optgroup {
                        self.pop_and_unref();
                    }
                    self.insert_from_view(&view)?;
                    Ok(Flow::Done)
                }
                Select => {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedStartTag, "nested select");
                    self.close_select();
                    Ok(Flow::Done)
                }
                Input | Textarea => {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedStartTag, "input in select");
                    self.close_select();
                    Ok(Flow::Reprocess(Tok::Start(view)))
                }
                Script => self.mode_in_head(Tok::Start(view), ctx),
                _ => {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedStartTag, "tag in select");
                    Ok(Flow::Done)
                }
            },
            Tok::End(view) => match view.etype {
                Optgroup => {
                    if self.current_type() == Option
                        && self
                            .stack
                            .get(self.stack.len().wrapping_sub(2))
                            .map(|e| e.etype == Optgroup)
                            .unwrap_or(false)
                    {
                        self.pop_and_unref();
                    }
                    if self.current_type() == Optgroup {
                        self.pop_and_unref();
                    } else {
                        self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "stray optgroup");
                    }
                    Ok(Flow::Done)
                }
                Option => {
                    if self.current_type() == Option {
                        self.pop_and_unref();
                    } else {
                        self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "stray option");
                    }
                    Ok(Flow::Done)
                }
                Select => {
                    if self.stack.in_scope(Select, ScopeKind::Table) {
                        self.close_select();
                    } else {
                        self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "stray select");
                    }
                    Ok(Flow::Done)
                }
                _ => {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "end tag in select");
                    Ok(Flow::Done)
                }
            },
            Tok::Eof => {
                if self.current_type() != Html {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedEof, "eof in select");
                }
                Ok(Flow::Done)
            }
        }
    }

    fn close_select(&mut self) {
        self.pop_until(ElementType::Select);
        self.reset_insertion_mode();
    }

    pub(crate) fn mode_in_select_in_table<'a>(
        &mut self,
        tok: Tok<'a>,
        ctx: &mut DocumentParseContext,
    ) -> ModeResult<'a> {
        use ElementType::*;
        match tok {
            Tok::Start(view)
                if matches!(view.etype, Caption | Table | Tbody | Tfoot | Thead | Tr | Td | Th) =>
            {
                self.parse_error(ctx, ParseErrorCode::UnexpectedStartTag, "table tag in select");
                self.close_select();
                Ok(Flow::Reprocess(Tok::Start(view)))
            }
            Tok::End(view)
                if matches!(view.etype, Caption | Table | Tbody | Tfoot | Thead | Tr | Td | Th) =>
            {
                self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "table end in select");
                if self.stack.in_scope(view.etype, ScopeKind::Table) {
                    self.close_select();
                    Ok(Flow::Reprocess(Tok::End(view)))
                } else {
                    Ok(Flow::Done)
                }
            }
            other => self.mode_in_select(other, ctx),
        }
    }

    pub(crate) fn mode_after_body<'a>(
        &mut self,
        tok: Tok<'a>,
        ctx: &mut DocumentParseContext,
    ) -> ModeResult<'a> {
        match tok {
            Tok::Char(text) => {
                let (ws, rest) = Self::split_leading_ws(text);
                if !ws.is_empty() {
                    self.mode_in_body(Tok::Char(ws), ctx)?;
                }
                if rest.is_empty() {
                    return Ok(Flow::Done);
                }
                self.parse_error(ctx, ParseErrorCode::UnexpectedCharacters, "text after body");
                self.mode = InsertionMode::InBody;
                Ok(Flow::Reprocess(Tok::Char(rest)))
            }
            Tok::Comment(text) => {
                let html = self
                    .stack
                    .get(0)
                    .expect("document element exists after body")
                    .node
                    .clone();
                self.append_comment_to(&html, text)?;
                Ok(Flow::Done)
            }
            Tok::Doctype { .. } => {
                self.parse_error(ctx, ParseErrorCode::MisplacedDoctype, "late doctype");
                Ok(Flow::Done)
            }
            Tok::End(view) if view.etype == ElementType::Html => {
                self.mode = InsertionMode::AfterAfterBody;
                Ok(Flow::Done)
            }
            Tok::Eof => Ok(Flow::Done),
            other => {
                self.parse_error(ctx, ParseErrorCode::UnexpectedStartTag, "token after body");
                self.mode = InsertionMode::InBody;
                Ok(Flow::Reprocess(other))
            }
        }
    }

    pub(crate) fn mode_in_frameset<'a>(
        &mut self,
        tok: Tok<'a>,
        ctx: &mut DocumentParseContext,
    ) -> ModeResult<'a> {
        use ElementType::*;
        match tok {
            Tok::Char(text) => {
                let (ws, _rest) = Self::split_leading_ws(text);
                self.append_text(ws)?;
                Ok(Flow::Done)
            }
            Tok::Comment(text) => {
                self.append_comment(text)?;
                Ok(Flow::Done)
            }
            Tok::Doctype { .. } => {
                self.parse_error(ctx, ParseErrorCode::MisplacedDoctype, "late doctype");
                Ok(Flow::Done)
            }
            Tok::Start(view) => match view.etype {
                Html => self.mode_in_body(Tok::Start(view), ctx),
                Frameset => {
                    self.insert_from_view(&view)?;
                    Ok(Flow::Done)
                }
                Frame => {
                    self.insert_element_no_push(Namespace::Html, view.name, &view.attrs)?;
                    Ok(Flow::Done)
                }
                Noframes => self.mode_in_head(Tok::Start(view), ctx),
                _ => {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedStartTag, "tag in frameset");
                    Ok(Flow::Done)
                }
            },
            Tok::End(view) if view.etype == Frameset => {
                if self.current_type() == Html {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "stray frameset end");
                } else {
                    self.pop_and_unref();
                    if self.current_type() != Frameset {
                        self.mode = InsertionMode::AfterFrameset;
                    }
                }
                Ok(Flow::Done)
            }
            Tok::End(_) => {
                self.parse_error(ctx, ParseErrorCode::UnexpectedEndTag, "end tag in frameset");
                Ok(Flow::Done)
            }
            Tok::Eof => {
                if self.current_type() != Html {
                    self.parse_error(ctx, ParseErrorCode::UnexpectedEof, "eof in frameset");
                }
                Ok(Flow::Done)
            }
        }
    }

    pub(crate) fn mode_after_frameset<'a>(
        &mut self,
        tok: Tok<'a>,
        ctx: &mut DocumentParseContext,
    ) -> ModeResult<'a> {
        use ElementType::*;
        match tok {
            Tok::Char(text) => {
                let (ws, _rest) = Self::split_leading_ws(text);
                self.append_text(ws)?;
                Ok(Flow::Done)
            }
            Tok::Comment(text) => {
                self.append_comment(text)?;
                Ok(Flow::Done)
            }
            Tok::Start(view) if view.etype == Html => self.mode_in_body(Tok::Start(view), ctx),
            Tok::Start(view) if view.etype == Noframes => self.mode_in_head(Tok::Start(view), ctx),
            Tok::End(view) if view.etype == Html => {
                self.mode = InsertionMode::AfterAfterFrameset;
                Ok(Flow::Done)
            }
            Tok::Eof => Ok(Flow::Done),
            _ => {
                self.parse_error(ctx, ParseErrorCode::UnexpectedStartTag, "token after frameset");
                Ok(Flow::Done)
            }
        }
    }

    pub(crate) fn mode_after_after_body<'a>(
        &mut self,
        tok: Tok<'a>,
        ctx: &mut DocumentParseContext,
    ) -> ModeResult<'a> {
        match tok {
            Tok::Comment(text) => {
                let doc = self.document.clone();
                self.append_comment_to(&doc, text)?;
                Ok(Flow::Done)
            }
            Tok::Char(text) => {
                let (ws, rest) = Self::split_leading_ws(text);
                if !ws.is_empty() {
                    self.mode_in_body(Tok::Char(ws), ctx)?;
                }
                if rest.is_empty() {
                    return Ok(Flow::Done);
                }
                self.parse_error(ctx, ParseErrorCode::UnexpectedCharacters, "trailing text");
                self.mode = InsertionMode::InBody;
                Ok(Flow::Reprocess(Tok::Char(rest)))
            }
            Tok::Doctype { .. } => {
                self.parse_error(ctx, ParseErrorCode::MisplacedDoctype, "late doctype");
                Ok(Flow::Done)
            }
            Tok::Eof => Ok(Flow::Done),
            other => {
                self.parse_error(ctx, ParseErrorCode::UnexpectedStartTag, "trailing token");
                self.mode = InsertionMode::InBody;
                Ok(Flow::Reprocess(other))
            }
        }
    }

    pub(crate) fn mode_after_after_frameset<'a>(
        &mut self,
        tok: Tok<'a>,
        ctx: &mut DocumentParseContext,
    ) -> ModeResult<'a> {
        match tok {
            Tok::Comment(text) => {
                let doc = self.document.clone();
                self.append_comment_to(&doc, text)?;
                Ok(Flow::Done)
            }
            Tok::Char(text) => {
                let (ws, _rest) = Self::split_leading_ws(text);
                if !ws.is_empty() {
                    self.mode_in_body(Tok::Char(ws), ctx)?;
                }
                Ok(Flow::Done)
            }
            Tok::Start(view) if view.etype == ElementType::Noframes => {
                self.mode_in_head(Tok::Start(view), ctx)
            }
            Tok::Eof => Ok(Flow::Done),
            _ => {
                self.parse_error(ctx, ParseErrorCode::UnexpectedStartTag, "trailing token");
                Ok(Flow::Done)
            }
        }
    }

    pub(crate) fn mode_in_foreign_content<'a>(
        &mut self,
        tok: Tok<'a>,
        ctx: &mut DocumentParseContext,
    ) -> ModeResult<'a> {
        use ElementType::*;
        match tok {
            Tok::Char(text) => {
                self.append_text(text)?;
                Ok(Flow::Done)
            }
            Tok::Comment(text) => {
                self.append_comment(text)?;
                Ok(Flow::Done)
            }
            Tok::Doctype { .. } => {
                self.parse_error(ctx, ParseErrorCode::MisplacedDoctype, "doctype in foreign");
                Ok(Flow::Done)
            }
            Tok::Start(view) => {
                let (cur_ns, cur_type) = {
                    let cur = self.current();
                    (cur.ns, cur.etype)
                };
                let integration = cur_ns == Namespace::MathMl
                    && cur_type.is_mathml_text_integration()
                    && !matches!(view.etype, Mglyph | Malignmark);
                if cur_ns == Namespace::Html || integration {
                    self.process_as_secondary(Tok::Start(view), ctx)?;
                    Ok(Flow::Done)
                } else if view.etype.is_foreign_break_out() {
                    self.parse_error(
                        ctx,
                        ParseErrorCode::ForeignContentBreakOut,
                        "html tag in foreign content",
                    );
                    self.foreign_break_out();
                    Ok(Flow::Reprocess(Tok::Start(view)))
                } else {
                    let mut view = view;
                    adjust_foreign_attributes(&mut view.attrs);
                    if view.self_closing {
                        self.insert_element_no_push(cur_ns, view.name, &view.attrs)?;
                    } else {
                        self.insert_element(cur_ns, view.etype, view.name, &view.attrs)?;
                    }
                    Ok(Flow::Done)
                }
            }
            Tok::End(view) => {
                self.process_as_secondary(Tok::End(view), ctx)?;
                Ok(Flow::Done)
            }
            Tok::Eof => {
                self.foreign_break_out();
                Ok(Flow::Reprocess(Tok::Eof))
            }
        }
    }

    /// Pop non-HTML elements until the current node is HTML again, then
    /// hand control back to the secondary mode.
    fn foreign_break_out(&mut self) {
        while self
            .stack
            .current()
            .map(|e| e.ns != Namespace::Html)
            .unwrap_or(false)
        {
            self.pop_and_unref();
        }
        self.mode = self.second_mode;
    }

    /// Process a token as if in the secondary insertion mode, restoring
    /// foreign content afterwards while foreign elements remain in scope.
    fn process_as_secondary(
        &mut self,
        tok: Tok<'_>,
        ctx: &mut DocumentParseContext,
    ) -> Result<(), TreeBuilderError> {
        self.mode = self.second_mode;
        self.run_modes(tok, ctx)?;
        if self.mode == self.second_mode {
            self.mode = InsertionMode::InForeignContent;
        }
        if self.mode == InsertionMode::InForeignContent && !self.has_foreign_in_scope() {
            self.mode = self.second_mode;
        }
        Ok(())
    }

    /// True iff an element in scope has a non-HTML namespace.
    fn has_foreign_in_scope(&self) -> bool {
        for (i, entry) in self.stack.iter().enumerate().rev() {
            if i == 0 {
                break;
            }
            if entry.etype == ElementType::Table || entry.etype.is_scoping() {
                break;
            }
            if entry.ns != Namespace::Html {
                return true;
            }
        }
        false
    }
}

fn has_hidden_type(attrs: &[AttrView<'_>]) -> bool {
    attrs
        .iter()
        .any(|a| a.name == b"type" && a.value.eq_ignore_ascii_case(b"hidden"))
}

/// Remap `xlink:*`, `xml:*`, and `xmlns` attribute names onto their
/// namespaces when inserting foreign elements.
fn adjust_foreign_attributes(attrs: &mut [AttrView<'_>]) {
    for attr in attrs {
        match attr.name {
            b"xlink:actuate" | b"xlink:arcrole" | b"xlink:href" | b"xlink:role"
            | b"xlink:show" | b"xlink:title" | b"xlink:type" => {
                attr.ns = Namespace::XLink;
                attr.name = &attr.name[b"xlink:".len()..];
            }
            b"xml:base" | b"xml:lang" | b"xml:space" => {
                attr.ns = Namespace::Xml;
                attr.name = &attr.name[b"xml:".len()..];
            }
            b"xmlns" => attr.ns = Namespace::Xmlns,
            b"xmlns:xlink" => {
                attr.ns = Namespace::Xmlns;
                attr.name = &attr.name[b"xmlns:".len()..];
            }
            _ => {}
        }
    }
}
