//! Embedder-facing tree construction contract.
//!
//! The tree builder never owns DOM storage; it drives an implementation of
//! [`TreeHandler`] supplied by the embedder. Handles are opaque and
//! reference-counted through `ref_node`/`unref_node`: every handle the
//! builder retains (stack of open elements, active formatting list, head and
//! form pointers) carries exactly one reference, released when the entry is
//! removed or on teardown.

use crate::html5::shared::Namespace;

/// Failure inside the embedder's handler (allocation, storage). Fatal to
/// the parse; no further tokens are processed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeHandlerError;

/// One attribute as handed to the handler. Slices borrow from the input
/// buffer and are only valid for the duration of the call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttrView<'a> {
    pub ns: Namespace,
    pub name: &'a [u8],
    pub value: &'a [u8],
}

/// Callback interface that actually builds the document tree.
pub trait TreeHandler {
    type Handle: Clone + PartialEq;

    /// The document node all parsing hangs off.
    fn document(&mut self) -> Self::Handle;

    fn create_element(
        &mut self,
        ns: Namespace,
        name: &[u8],
        attrs: &[AttrView<'_>],
    ) -> Result<Self::Handle, TreeHandlerError>;
    fn create_text(&mut self, text: &[u8]) -> Result<Self::Handle, TreeHandlerError>;
    fn create_comment(&mut self, text: &[u8]) -> Result<Self::Handle, TreeHandlerError>;
    fn create_doctype(
        &mut self,
        name: &[u8],
        public_id: Option<&[u8]>,
        system_id: Option<&[u8]>,
    ) -> Result<Self::Handle, TreeHandlerError>;

    /// Shallow clone: element type and attributes, no children.
    fn clone_node(&mut self, node: &Self::Handle) -> Result<Self::Handle, TreeHandlerError>;

    fn append_child(
        &mut self,
        parent: &Self::Handle,
        child: &Self::Handle,
    ) -> Result<(), TreeHandlerError>;
    fn insert_before(
        &mut self,
        parent: &Self::Handle,
        child: &Self::Handle,
        before: &Self::Handle,
    ) -> Result<(), TreeHandlerError>;
    /// Remove `node` from its parent, if any.
    fn detach(&mut self, node: &Self::Handle) -> Result<(), TreeHandlerError>;
    /// Move all children of `from` onto the end of `to`.
    fn reparent_children(
        &mut self,
        from: &Self::Handle,
        to: &Self::Handle,
    ) -> Result<(), TreeHandlerError>;
    fn get_parent(
        &mut self,
        node: &Self::Handle,
    ) -> Result<Option<Self::Handle>, TreeHandlerError>;

    /// Add the attributes that are not already present on `node`.
    fn add_attributes(
        &mut self,
        node: &Self::Handle,
        attrs: &[AttrView<'_>],
    ) -> Result<(), TreeHandlerError>;

    /// Associate a form control with the currently open form, if any.
    fn associate_form(
        &mut self,
        form: Option<&Self::Handle>,
        node: &Self::Handle,
    ) -> Result<(), TreeHandlerError>;

    fn ref_node(&mut self, node: &Self::Handle);
    fn unref_node(&mut self, node: &Self::Handle);
}
