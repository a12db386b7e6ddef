//! Test-only DOM sink for the HTML5 parsing pipeline.
//!
//! [`TestDom`] implements the parser's `TreeHandler` over a plain arena of
//! nodes and audits the reference-counting contract: every `ref_node` must
//! be balanced by exactly one `unref_node` before teardown, and unref never
//! goes below zero. Trees can be rendered as an indented dump (html5lib
//! style) for golden tests or serialised to JSON for diffing.

use html::html5::{AttrView, Namespace, TreeHandler, TreeHandlerError};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

mod dump;

pub use dump::tree_dump;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Document,
    Element {
        ns: Namespace,
        name: String,
        attrs: Vec<(Namespace, String, String)>,
    },
    Text(String),
    Comment(String),
    Doctype {
        name: String,
        public_id: Option<String>,
        system_id: Option<String>,
    },
}

#[derive(Debug)]
pub struct NodeData {
    pub kind: NodeKind,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub refcount: i64,
}

#[derive(Debug, Default)]
pub struct DomStore {
    pub nodes: Vec<NodeData>,
    pub refs_issued: u64,
    pub refs_released: u64,
    pub form_associations: Vec<(usize, Option<usize>)>,
}

impl DomStore {
    fn add(&mut self, kind: NodeKind) -> usize {
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
            refcount: 0,
        });
        self.nodes.len() - 1
    }

    fn detach(&mut self, node: usize) {
        if let Some(parent) = self.nodes[node].parent.take() {
            self.nodes[parent].children.retain(|&c| c != node);
        }
    }
}

/// Arena DOM behind `Rc<RefCell<..>>` so tests can keep inspecting the tree
/// while the parser owns the handler.
#[derive(Clone, Default)]
pub struct TestDom {
    store: Rc<RefCell<DomStore>>,
}

impl TestDom {
    pub fn new() -> Self {
        let dom = Self::default();
        let id = dom.store.borrow_mut().add(NodeKind::Document);
        debug_assert_eq!(id, 0);
        dom
    }

    pub fn store(&self) -> std::cell::Ref<'_, DomStore> {
        self.store.borrow()
    }

    /// References issued minus references released; zero once the parser
    /// has been dropped.
    pub fn outstanding_refs(&self) -> i64 {
        self.store.borrow().nodes.iter().map(|n| n.refcount).sum()
    }

    /// Indented tree dump rooted at the document.
    pub fn dump(&self) -> String {
        dump::tree_dump(&self.store.borrow())
    }

    /// JSON rendering of the tree for structural diffs.
    pub fn to_json(&self) -> String {
        let store = self.store.borrow();
        let snapshot = SnapshotNode::build(&store, 0);
        serde_json::to_string_pretty(&snapshot).expect("snapshot serialisation")
    }
}

#[derive(Serialize)]
pub struct SnapshotNode {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attrs: Vec<[String; 2]>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SnapshotNode>,
}

impl SnapshotNode {
    fn build(store: &DomStore, id: usize) -> Self {
        let node = &store.nodes[id];
        let children = node
            .children
            .iter()
            .map(|&c| Self::build(store, c))
            .collect();
        match &node.kind {
            NodeKind::Document => Self {
                kind: "document",
                name: None,
                text: None,
                attrs: Vec::new(),
                children,
            },
            NodeKind::Element { ns, name, attrs } => Self {
                kind: "element",
                name: Some(dump::qualified_name(*ns, name)),
                text: None,
                attrs: attrs
                    .iter()
                    .map(|(ans, an, av)| [dump::qualified_name(*ans, an), av.clone()])
                    .collect(),
                children,
            },
            NodeKind::Text(text) => Self {
                kind: "text",
                name: None,
                text: Some(text.clone()),
                attrs: Vec::new(),
                children,
            },
            NodeKind::Comment(text) => Self {
                kind: "comment",
                name: None,
                text: Some(text.clone()),
                attrs: Vec::new(),
                children,
            },
            NodeKind::Doctype { name, .. } => Self {
                kind: "doctype",
                name: Some(name.clone()),
                text: None,
                attrs: Vec::new(),
                children,
            },
        }
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

impl TreeHandler for TestDom {
    type Handle = usize;

    fn document(&mut self) -> usize {
        0
    }

    fn create_element(
        &mut self,
        ns: Namespace,
        name: &[u8],
        attrs: &[AttrView<'_>],
    ) -> Result<usize, TreeHandlerError> {
        Ok(self.store.borrow_mut().add(NodeKind::Element {
            ns,
            name: lossy(name),
            attrs: attrs
                .iter()
                .map(|a| (a.ns, lossy(a.name), lossy(a.value)))
                .collect(),
        }))
    }

    fn create_text(&mut self, text: &[u8]) -> Result<usize, TreeHandlerError> {
        Ok(self.store.borrow_mut().add(NodeKind::Text(lossy(text))))
    }

    fn create_comment(&mut self, text: &[u8]) -> Result<usize, TreeHandlerError> {
        Ok(self.store.borrow_mut().add(NodeKind::Comment(lossy(text))))
    }

    fn create_doctype(
        &mut self,
        name: &[u8],
        public_id: Option<&[u8]>,
        system_id: Option<&[u8]>,
    ) -> Result<usize, TreeHandlerError> {
        Ok(self.store.borrow_mut().add(NodeKind::Doctype {
            name: lossy(name),
            public_id: public_id.map(lossy),
            system_id: system_id.map(lossy),
        }))
    }

    fn clone_node(&mut self, node: &usize) -> Result<usize, TreeHandlerError> {
        let kind = self.store.borrow().nodes[*node].kind.clone();
        Ok(self.store.borrow_mut().add(kind))
    }

    fn append_child(&mut self, parent: &usize, child: &usize) -> Result<(), TreeHandlerError> {
        let mut store = self.store.borrow_mut();
        store.detach(*child);
        // Adjacent text nodes coalesce, like production sinks do.
        let child_text = match &store.nodes[*child].kind {
            NodeKind::Text(text) => Some(text.clone()),
            _ => None,
        };
        if let Some(text) = child_text {
            if let Some(&last) = store.nodes[*parent].children.last() {
                if let NodeKind::Text(existing) = &mut store.nodes[last].kind {
                    existing.push_str(&text);
                    return Ok(());
                }
            }
        }
        store.nodes[*child].parent = Some(*parent);
        store.nodes[*parent].children.push(*child);
        Ok(())
    }

    fn insert_before(
        &mut self,
        parent: &usize,
        child: &usize,
        before: &usize,
    ) -> Result<(), TreeHandlerError> {
        let mut store = self.store.borrow_mut();
        store.detach(*child);
        store.nodes[*child].parent = Some(*parent);
        let children = &mut store.nodes[*parent].children;
        match children.iter().position(|&c| c == *before) {
            Some(idx) => children.insert(idx, *child),
            None => children.push(*child),
        }
        Ok(())
    }

    fn detach(&mut self, node: &usize) -> Result<(), TreeHandlerError> {
        self.store.borrow_mut().detach(*node);
        Ok(())
    }

    fn reparent_children(&mut self, from: &usize, to: &usize) -> Result<(), TreeHandlerError> {
        let mut store = self.store.borrow_mut();
        let children = std::mem::take(&mut store.nodes[*from].children);
        for &c in &children {
            store.nodes[c].parent = Some(*to);
        }
        store.nodes[*to].children.extend(children);
        Ok(())
    }

    fn get_parent(&mut self, node: &usize) -> Result<Option<usize>, TreeHandlerError> {
        Ok(self.store.borrow().nodes[*node].parent)
    }

    fn add_attributes(
        &mut self,
        node: &usize,
        attrs: &[AttrView<'_>],
    ) -> Result<(), TreeHandlerError> {
        let mut store = self.store.borrow_mut();
        let NodeKind::Element {
            attrs: existing, ..
        } = &mut store.nodes[*node].kind
        else {
            return Err(TreeHandlerError);
        };
        for attr in attrs {
            let name = lossy(attr.name);
            if !existing.iter().any(|(_, n, _)| *n == name) {
                existing.push((attr.ns, name, lossy(attr.value)));
            }
        }
        Ok(())
    }

    fn associate_form(
        &mut self,
        form: Option<&usize>,
        node: &usize,
    ) -> Result<(), TreeHandlerError> {
        self.store
            .borrow_mut()
            .form_associations
            .push((*node, form.copied()));
        Ok(())
    }

    fn ref_node(&mut self, node: &usize) {
        let mut store = self.store.borrow_mut();
        store.nodes[*node].refcount += 1;
        store.refs_issued += 1;
    }

    fn unref_node(&mut self, node: &usize) {
        let mut store = self.store.borrow_mut();
        assert!(
            store.nodes[*node].refcount > 0,
            "unref below zero for node {node}"
        );
        store.nodes[*node].refcount -= 1;
        store.refs_released += 1;
    }
}
