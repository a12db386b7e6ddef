//! Active formatting elements: the list, reconstruction, and the adoption
//! agency algorithm for misnested formatting tags.

use super::handler::{AttrView, TreeHandler};
use super::stack::OpenElement;
use super::types::{ElementType, ScopeKind};
use super::{Html5TreeBuilder, TreeBuilderError};
use crate::html5::shared::{DocumentParseContext, Namespace, ParseErrorCode};

/// Owned copy of one attribute, kept in tag snapshots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct OwnedAttr {
    pub ns: Namespace,
    pub name: Vec<u8>,
    pub value: Vec<u8>,
}

/// Owned copy of the tag a formatting element was created from, used to
/// re-create the element during reconstruction and to compare entries for
/// the Noah's Ark clause.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TagSnapshot {
    pub name: Vec<u8>,
    pub attrs: Vec<OwnedAttr>,
}

impl TagSnapshot {
    pub fn from_view(name: &[u8], attrs: &[AttrView<'_>]) -> Self {
        Self {
            name: name.to_vec(),
            attrs: attrs
                .iter()
                .map(|a| OwnedAttr {
                    ns: a.ns,
                    name: a.name.to_vec(),
                    value: a.value.to_vec(),
                })
                .collect(),
        }
    }

    pub fn attr_views(&self) -> Vec<AttrView<'_>> {
        self.attrs
            .iter()
            .map(|a| AttrView {
                ns: a.ns,
                name: &a.name,
                value: &a.value,
            })
            .collect()
    }
}

#[derive(Clone, Debug)]
pub(crate) struct FormattingElement<H> {
    pub etype: ElementType,
    pub node: H,
    pub tag: TagSnapshot,
}

#[derive(Clone, Debug)]
pub(crate) enum FormattingEntry<H> {
    Marker,
    Element(FormattingElement<H>),
}

/// Ordered list of active formatting elements and markers.
#[derive(Debug)]
pub(crate) struct ActiveFormattingList<H> {
    entries: Vec<FormattingEntry<H>>,
}

impl<H: Clone + PartialEq> ActiveFormattingList<H> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FormattingEntry<H>> {
        self.entries.get(index)
    }

    pub fn push_marker(&mut self) {
        self.entries.push(FormattingEntry::Marker);
    }

    pub fn push_element(&mut self, element: FormattingElement<H>) {
        self.entries.push(FormattingEntry::Element(element));
    }

    pub fn insert_element(&mut self, index: usize, element: FormattingElement<H>) {
        self.entries.insert(index, FormattingEntry::Element(element));
    }

    pub fn pop(&mut self) -> Option<FormattingEntry<H>> {
        self.entries.pop()
    }

    pub fn remove(&mut self, index: usize) -> FormattingEntry<H> {
        self.entries.remove(index)
    }

    pub fn take_all(&mut self) -> Vec<FormattingEntry<H>> {
        std::mem::take(&mut self.entries)
    }

    /// Replace an entry's node handle, returning the old one.
    pub fn set_node(&mut self, index: usize, node: H) -> H {
        match &mut self.entries[index] {
            FormattingEntry::Element(el) => std::mem::replace(&mut el.node, node),
            FormattingEntry::Marker => unreachable!("markers carry no node"),
        }
    }

    /// Most recent entry for `etype` between the end of the list and the
    /// last marker.
    pub fn last_match_after_marker(&self, etype: ElementType) -> Option<usize> {
        for (i, entry) in self.entries.iter().enumerate().rev() {
            match entry {
                FormattingEntry::Marker => return None,
                FormattingEntry::Element(el) if el.etype == etype => return Some(i),
                FormattingEntry::Element(_) => {}
            }
        }
        None
    }

    pub fn position_of_node(&self, node: &H) -> Option<usize> {
        self.entries.iter().rposition(|e| match e {
            FormattingEntry::Element(el) => &el.node == node,
            FormattingEntry::Marker => false,
        })
    }
}

impl<H: TreeHandler> Html5TreeBuilder<H> {
    /// Push onto the list, applying the Noah's Ark clause: at most three
    /// equal entries (same type, same original attributes) since the last
    /// marker.
    pub(crate) fn push_formatting_element(
        &mut self,
        etype: ElementType,
        node: H::Handle,
        tag: TagSnapshot,
    ) {
        let mut equal = Vec::new();
        for (i, entry) in self.formatting_entries_enumerated_rev() {
            match entry {
                FormattingEntry::Marker => break,
                FormattingEntry::Element(el) => {
                    if el.etype == etype && el.tag == tag {
                        equal.push(i);
                    }
                }
            }
        }
        if equal.len() >= 3 {
            let earliest = *equal.last().expect("non-empty");
            if let FormattingEntry::Element(el) = self.formatting.remove(earliest) {
                self.handler.unref_node(&el.node);
            }
        }
        self.handler.ref_node(&node);
        self.formatting.push_element(FormattingElement { etype, node, tag });
    }

    fn formatting_entries_enumerated_rev(
        &self,
    ) -> impl Iterator<Item = (usize, &FormattingEntry<H::Handle>)> {
        (0..self.formatting.len())
            .rev()
            .map(|i| (i, self.formatting.get(i).expect("indexed entry")))
    }

    /// Pop entries until and including the most recent marker.
    pub(crate) fn clear_formatting_to_marker(&mut self) {
        while let Some(entry) = self.formatting.pop() {
            match entry {
                FormattingEntry::Marker => break,
                FormattingEntry::Element(el) => self.handler.unref_node(&el.node),
            }
        }
    }

    /// Re-open formatting elements whose elements were closed but whose
    /// formatting still applies to newly inserted content.
    pub(crate) fn reconstruct_formatting(&mut self) -> Result<(), TreeBuilderError> {
        if self.formatting.is_empty() {
            return Ok(());
        }
        let len = self.formatting.len();
        match self.formatting.get(len - 1).expect("non-empty") {
            FormattingEntry::Marker => return Ok(()),
            FormattingEntry::Element(el) => {
                if self.stack.position_of_node(&el.node).is_some() {
                    return Ok(());
                }
            }
        }

        let mut start = 0;
        for i in (0..len).rev() {
            let open = match self.formatting.get(i).expect("indexed entry") {
                FormattingEntry::Marker => true,
                FormattingEntry::Element(el) => self.stack.position_of_node(&el.node).is_some(),
            };
            if open {
                start = i + 1;
                break;
            }
        }

        for i in start..len {
            let (etype, node) = {
                let el = match self.formatting.get(i).expect("indexed entry") {
                    FormattingEntry::Element(el) => el,
                    FormattingEntry::Marker => continue,
                };
                let views = el.tag.attr_views();
                let node = self
                    .handler
                    .create_element(Namespace::Html, &el.tag.name, &views)?;
                (el.etype, node)
            };
            self.append_node(&node)?;
            self.handler.ref_node(&node);
            self.stack.push(OpenElement {
                ns: Namespace::Html,
                etype,
                node: node.clone(),
            });
            self.handler.ref_node(&node);
            let old = self.formatting.set_node(i, node);
            self.handler.unref_node(&old);
        }
        Ok(())
    }

    /// The adoption agency algorithm for misnested formatting end tags.
    pub(crate) fn adoption_agency(
        &mut self,
        subject: ElementType,
        ctx: &mut DocumentParseContext,
    ) -> Result<(), TreeBuilderError> {
        for _ in 0..8 {
            let Some(fmt_list_idx) = self.formatting.last_match_after_marker(subject) else {
                return Ok(());
            };
            let fmt_node = match self.formatting.get(fmt_list_idx).expect("indexed entry") {
                FormattingEntry::Element(el) => el.node.clone(),
                FormattingEntry::Marker => unreachable!("matched entry is an element"),
            };

            let Some(fmt_stack_idx) = self.stack.position_of_node(&fmt_node) else {
                self.parse_error(
                    ctx,
                    ParseErrorCode::MisnestedFormatting,
                    "formatting element already closed",
                );
                if let FormattingEntry::Element(el) = self.formatting.remove(fmt_list_idx) {
                    self.handler.unref_node(&el.node);
                }
                return Ok(());
            };
            if !self.stack.index_in_scope(fmt_stack_idx, ScopeKind::Default) {
                self.parse_error(
                    ctx,
                    ParseErrorCode::MisnestedFormatting,
                    "formatting element out of scope",
                );
                return Ok(());
            }
            if fmt_stack_idx != self.stack.len() - 1 {
                self.parse_error(
                    ctx,
                    ParseErrorCode::MisnestedFormatting,
                    "formatting element not current",
                );
            }

            // Furthest block: deepest special element above the formatting
            // element.
            let mut furthest = None;
            for i in fmt_stack_idx + 1..self.stack.len() {
                if self
                    .stack
                    .get(i)
                    .expect("indexed entry")
                    .etype
                    .is_special_or_scoping()
                {
                    furthest = Some(i);
                    break;
                }
            }
            let Some(fb_idx) = furthest else {
                // No furthest block: pop through the formatting element and
                // drop its list entry.
                while self.stack.len() > fmt_stack_idx {
                    self.pop_and_unref();
                }
                if let FormattingEntry::Element(el) = self.formatting.remove(fmt_list_idx) {
                    self.handler.unref_node(&el.node);
                }
                return Ok(());
            };

            let fb_node = self.stack.get(fb_idx).expect("indexed entry").node.clone();
            let common_ancestor = self
                .stack
                .get(fmt_stack_idx - 1)
                .expect("formatting element is never the stack bottom")
                .node
                .clone();
            let common_ancestor_type = self
                .stack
                .get(fmt_stack_idx - 1)
                .expect("indexed entry")
                .etype;

            let mut bookmark = fmt_list_idx;
            let mut last_node = fb_node.clone();
            let mut node_idx = fb_idx;
            let mut inner = 0usize;
            loop {
                node_idx -= 1;
                if node_idx == fmt_stack_idx {
                    break;
                }
                inner += 1;
                let node = self.stack.get(node_idx).expect("indexed entry").node.clone();
                let list_pos = self.formatting.position_of_node(&node);

                if inner > 3 {
                    if let Some(lp) = list_pos {
                        if let FormattingEntry::Element(el) = self.formatting.remove(lp) {
                            self.handler.unref_node(&el.node);
                        }
                        if lp < bookmark {
                            bookmark -= 1;
                        }
                    }
                    let removed = self.stack.remove(node_idx);
                    self.handler.unref_node(&removed.node);
                    continue;
                }

                let Some(lp) = list_pos else {
                    let removed = self.stack.remove(node_idx);
                    self.handler.unref_node(&removed.node);
                    continue;
                };

                // Clone the node; both the list entry and the stack entry
                // now refer to the clone.
                let clone = self.handler.clone_node(&node)?;
                self.handler.ref_node(&clone);
                let old = self.formatting.set_node(lp, clone.clone());
                self.handler.unref_node(&old);
                self.handler.ref_node(&clone);
                let old = self.stack.set_node(node_idx, clone.clone());
                self.handler.unref_node(&old);

                if last_node == fb_node {
                    bookmark = lp + 1;
                }

                self.handler.detach(&last_node)?;
                self.handler.append_child(&clone, &last_node)?;
                last_node = clone;
            }

            // Hang the assembled chain off the common ancestor, foster
            // parenting when that ancestor is a table context.
            self.handler.detach(&last_node)?;
            if matches!(
                common_ancestor_type,
                ElementType::Table
                    | ElementType::Tbody
                    | ElementType::Tfoot
                    | ElementType::Thead
                    | ElementType::Tr
            ) {
                self.foster_insert(&last_node)?;
            } else {
                self.handler.append_child(&common_ancestor, &last_node)?;
            }

            // Fresh element for the formatting entry; the furthest block's
            // children move under it.
            let new_fmt = self.handler.clone_node(&fmt_node)?;
            self.handler.reparent_children(&fb_node, &new_fmt)?;
            self.handler.append_child(&fb_node, &new_fmt)?;

            let old_entry = self.formatting.remove(fmt_list_idx);
            if fmt_list_idx < bookmark {
                bookmark -= 1;
            }
            let snapshot = match old_entry {
                FormattingEntry::Element(el) => {
                    self.handler.unref_node(&el.node);
                    el.tag
                }
                FormattingEntry::Marker => unreachable!("matched entry is an element"),
            };
            self.handler.ref_node(&new_fmt);
            self.formatting.insert_element(
                bookmark,
                FormattingElement {
                    etype: subject,
                    node: new_fmt.clone(),
                    tag: snapshot,
                },
            );

            let fmt_pos = self
                .stack
                .position_of_node(&fmt_node)
                .expect("formatting element still on stack");
            let removed = self.stack.remove(fmt_pos);
            self.handler.unref_node(&removed.node);
            let fb_pos = self
                .stack
                .position_of_node(&fb_node)
                .expect("furthest block still on stack");
            self.handler.ref_node(&new_fmt);
            self.stack.insert(
                fb_pos + 1,
                OpenElement {
                    ns: Namespace::Html,
                    etype: subject,
                    node: new_fmt,
                },
            );
        }
        Ok(())
    }
}
