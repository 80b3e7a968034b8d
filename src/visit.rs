//! Depth-first AST traversal with mutation control.
//!
//! The callback receives the node's key relative to its parent (`Root`,
//! `Index(n)` in a sequence, `Key`/`Value` inside a mapping pair), the node
//! itself, and the path of ancestor keys. Its return value steers the walk:
//! keep going, skip children, abort, remove the node, replace it (the
//! replacement is itself visited), or redirect the parent's iteration to a
//! given index. Mutation during traversal is supported; an integer return
//! is how the caller keeps the active index valid after structural edits.

use crate::node::Node;

/// Traversal control returned by a visitor callback.
#[derive(Debug)]
pub enum Visit {
    Continue,
    /// Do not descend into this node's children.
    Skip,
    /// Abort the whole traversal.
    Break,
    /// Remove this node from its parent and continue at the same index.
    /// Inside a pair the key or value slot becomes empty; at the root this
    /// is a no-op.
    Remove,
    /// Replace this node and visit the replacement.
    Replace(Node),
    /// Continue the parent collection's iteration at this item index.
    Jump(usize),
}

/// A node's position relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitKey {
    Root,
    /// Item index in a sequence, or pair index in a mapping.
    Index(usize),
    /// The key side of a mapping pair.
    Key,
    /// The value side of a mapping pair.
    Value,
}

/// Walk `node` depth-first, calling `f` for every node.
pub fn visit<F>(node: &mut Node, f: &mut F)
where
    F: FnMut(VisitKey, &mut Node, &[VisitKey]) -> Visit,
{
    let mut path = Vec::new();
    visit_node(VisitKey::Root, node, f, &mut path);
}

/// What a visited child asks of its parent.
enum Action {
    Continue,
    Break,
    Remove,
    Jump(usize),
}

fn visit_node<F>(key: VisitKey, node: &mut Node, f: &mut F, path: &mut Vec<VisitKey>) -> Action
where
    F: FnMut(VisitKey, &mut Node, &[VisitKey]) -> Visit,
{
    loop {
        match f(key, node, path) {
            Visit::Continue => break,
            Visit::Skip => return Action::Continue,
            Visit::Break => return Action::Break,
            Visit::Remove => return Action::Remove,
            Visit::Jump(i) => return Action::Jump(i),
            Visit::Replace(new) => {
                *node = new;
                // The replacement is visited in place.
            }
        }
    }
    match node {
        Node::Scalar(_) | Node::Alias(_) => Action::Continue,
        Node::Seq(seq) => {
            let mut i = 0;
            while i < seq.items.len() {
                path.push(VisitKey::Index(i));
                let action = visit_node(VisitKey::Index(i), &mut seq.items[i], f, path);
                path.pop();
                match action {
                    Action::Continue => i += 1,
                    Action::Break => return Action::Break,
                    Action::Remove => {
                        seq.items.remove(i);
                    }
                    Action::Jump(j) => i = j,
                }
            }
            Action::Continue
        }
        Node::Map(map) => {
            let mut i = 0;
            while i < map.items.len() {
                path.push(VisitKey::Index(i));
                let mut jump = None;
                let mut stop = false;
                if let Some(k) = map.items[i].key.as_mut() {
                    match visit_node(VisitKey::Key, k, f, path) {
                        Action::Continue => {}
                        Action::Break => stop = true,
                        Action::Remove => map.items[i].key = None,
                        Action::Jump(j) => jump = Some(j),
                    }
                }
                if !stop && jump.is_none() {
                    if let Some(v) = map.items[i].value.as_mut() {
                        match visit_node(VisitKey::Value, v, f, path) {
                            Action::Continue => {}
                            Action::Break => stop = true,
                            Action::Remove => map.items[i].value = None,
                            Action::Jump(j) => jump = Some(j),
                        }
                    }
                }
                path.pop();
                if stop {
                    return Action::Break;
                }
                match jump {
                    Some(j) => i = j,
                    None => i += 1,
                }
            }
            Action::Continue
        }
    }
}
