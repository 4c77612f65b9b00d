//! Parent/child index over an immutable program tree.
//!
//! Nodes are shared and never point at their parents; the relation lives here
//! instead. Editing goes through [`Tree::replace`], which copies the path from
//! the edited node to the root and leaves every other node (and its caches)
//! shared with the previous tree.

use std::rc::Rc;

use crate::interpreter::cps::expand::Expansion;
use crate::interpreter::cps::value::Value;
use crate::interpreter::cps::RuntimeError;
use crate::runtime_error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parent {
    pub owner: NodeId,
    /// Position in the owner; map entries count keys and values alternately.
    pub index: usize,
}

pub struct Tree {
    nodes: Vec<Value>,
    parents: Vec<Option<Parent>>,
    children: Vec<Vec<NodeId>>,
}

fn children(value: &Value) -> Vec<Value> {
    match value {
        Value::List(seq) | Value::Vector(seq) => seq.items().to_vec(),
        Value::Map(map) => map.entries().iter().flat_map(|(k, v)| [k.clone(), v.clone()]).collect(),
        _ => Vec::new(),
    }
}

fn with_child(owner: &Value, index: usize, child: Value) -> Result<Value, RuntimeError> {
    match owner {
        Value::List(seq) => Ok(Value::List(Rc::new(seq.replaced(index, child)?))),
        Value::Vector(seq) => Ok(Value::Vector(Rc::new(seq.replaced(index, child)?))),
        Value::Map(map) => Ok(Value::Map(Rc::new(map.replaced(index, child)?))),
        _ => runtime_error!(Unsupported, "{:?} has no children", owner),
    }
}

impl Tree {
    pub fn new(root: Value) -> Tree {
        let mut tree = Tree {
            nodes: Vec::new(),
            parents: Vec::new(),
            children: Vec::new(),
        };
        tree.index(root, None);
        tree
    }

    fn index(&mut self, value: Value, parent: Option<Parent>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let kids = children(&value);
        self.nodes.push(value);
        self.parents.push(parent);
        self.children.push(Vec::with_capacity(kids.len()));
        for (index, child) in kids.into_iter().enumerate() {
            let child_id = self.index(child, Some(Parent { owner: id, index }));
            self.children[id.0].push(child_id);
        }
        id
    }

    pub fn root_id(&self) -> NodeId { NodeId(0) }

    pub fn root(&self) -> &Value { &self.nodes[0] }

    pub fn len(&self) -> usize { self.nodes.len() }

    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    pub fn node(&self, id: NodeId) -> Option<&Value> { self.nodes.get(id.0) }

    pub fn parent(&self, id: NodeId) -> Option<Parent> { self.parents.get(id.0).copied().flatten() }

    /// The collection directly containing `id`.
    pub fn enclosing(&self, id: NodeId) -> Option<NodeId> { self.parent(id).map(|p| p.owner) }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> { self.children.get(id.0).and_then(|c| c.get(index)).copied() }

    /// Child indices leading from the root to `id`.
    pub fn path(&self, id: NodeId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut cursor = id;
        while let Some(parent) = self.parent(cursor) {
            path.push(parent.index);
            cursor = parent.owner;
        }
        path.reverse();
        path
    }

    pub fn at_path(&self, path: &[usize]) -> Option<NodeId> {
        path.iter().try_fold(self.root_id(), |id, &index| self.child(id, index))
    }

    /// First node identical to `value`. Atomic values other than `nil` have no
    /// identity and are never found.
    pub fn find(&self, value: &Value) -> Option<NodeId> { self.nodes.iter().position(|n| n.ptr_eq(value)).map(NodeId) }

    pub fn expansion(&self, id: NodeId) -> Option<Expansion> {
        match self.node(id) {
            Some(Value::List(seq)) => seq.expansion(),
            _ => None,
        }
    }

    /// True when `id` was last evaluated as a macro call.
    pub fn is_macro_call(&self, id: NodeId) -> bool { matches!(self.expansion(id), Some(Expansion::Constant(..) | Expansion::Env(_))) }

    /// Swap the node at `id` for `value`, rebuilding its ancestors. Returns
    /// the id of the new node; ids from before the edit are stale.
    pub fn replace(&mut self, id: NodeId, value: Value) -> Result<NodeId, RuntimeError> {
        if id.0 >= self.nodes.len() {
            runtime_error!(IndexOutOfRange, "No node {:?} in a tree of {}", id, self.nodes.len())
        }
        let path = self.path(id);
        let mut current = value;
        let mut cursor = id;
        while let Some(parent) = self.parent(cursor) {
            current = with_child(&self.nodes[parent.owner.0], parent.index, current)?;
            cursor = parent.owner;
        }
        *self = Tree::new(current);
        match self.at_path(&path) {
            Some(new_id) => Ok(new_id),
            None => runtime_error!(IndexOutOfRange, "Path {:?} vanished after replace", path),
        }
    }
}
