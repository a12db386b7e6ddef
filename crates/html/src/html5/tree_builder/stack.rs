//! Stack of open elements and the scope tests over it.

use super::types::{ElementType, ScopeKind};
use crate::html5::shared::Namespace;

/// Entry on the stack of open elements. The handle carries one reference,
/// released by whoever pops or removes the entry.
#[derive(Clone, Debug)]
pub(crate) struct OpenElement<H> {
    pub ns: Namespace,
    pub etype: ElementType,
    pub node: H,
}

/// LIFO of open elements. Index 0 is the `html` document element for the
/// lifetime of the parse once it has been created.
#[derive(Debug)]
pub(crate) struct ElementStack<H> {
    items: Vec<OpenElement<H>>,
}

impl<H: Clone + PartialEq> ElementStack<H> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn push(&mut self, entry: OpenElement<H>) {
        self.items.push(entry);
    }

    pub fn pop(&mut self) -> Option<OpenElement<H>> {
        self.items.pop()
    }

    pub fn current(&self) -> Option<&OpenElement<H>> {
        self.items.last()
    }

    pub fn current_type(&self) -> Option<ElementType> {
        self.items.last().map(|e| e.etype)
    }

    pub fn get(&self, index: usize) -> Option<&OpenElement<H>> {
        self.items.get(index)
    }

    pub fn remove(&mut self, index: usize) -> OpenElement<H> {
        self.items.remove(index)
    }

    pub fn insert(&mut self, index: usize, entry: OpenElement<H>) {
        self.items.insert(index, entry);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OpenElement<H>> {
        self.items.iter()
    }

    /// Replace an entry's node handle, returning the old one.
    pub fn set_node(&mut self, index: usize, node: H) -> H {
        std::mem::replace(&mut self.items[index].node, node)
    }

    pub fn take_all(&mut self) -> Vec<OpenElement<H>> {
        std::mem::take(&mut self.items)
    }

    /// Index of the entry holding `node`, topmost match.
    pub fn position_of_node(&self, node: &H) -> Option<usize> {
        self.items.iter().rposition(|e| &e.node == node)
    }

    /// Walk down from the current node; `target` is in scope unless a
    /// scoping element for `kind` intervenes first.
    pub fn in_scope(&self, target: ElementType, kind: ScopeKind) -> bool {
        for entry in self.items.iter().rev() {
            if entry.ns == Namespace::Html && entry.etype == target {
                return true;
            }
            if Self::terminates_scope(entry.etype, kind) {
                return false;
            }
        }
        false
    }

    pub fn any_in_scope(&self, targets: &[ElementType], kind: ScopeKind) -> bool {
        targets.iter().any(|t| self.in_scope(*t, kind))
    }

    /// Scope test for one specific entry rather than an element type.
    pub fn index_in_scope(&self, index: usize, kind: ScopeKind) -> bool {
        for (i, entry) in self.items.iter().enumerate().rev() {
            if i == index {
                return true;
            }
            if Self::terminates_scope(entry.etype, kind) {
                return false;
            }
        }
        false
    }

    fn terminates_scope(etype: ElementType, kind: ScopeKind) -> bool {
        match kind {
            ScopeKind::Table => matches!(etype, ElementType::Html | ElementType::Table),
            ScopeKind::Default => etype.is_scoping(),
            ScopeKind::ListItem => {
                etype.is_scoping() || matches!(etype, ElementType::Ol | ElementType::Ul)
            }
            ScopeKind::Button => etype.is_scoping() || etype == ElementType::Button,
        }
    }
}
