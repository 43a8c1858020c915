//! Namespace: the rooted tree of nodes.
//!
//! Nodes live in an arena keyed by [`NodeId`]. Each slot holds the node, a
//! non-owning parent id and the ordered child ids. A single read-write lock
//! guards the arena; every structural change (insert, remove, reconcile merge)
//! runs entirely under the write lock, so check-then-insert is atomic across
//! sessions. The lock is never held across an `.await`.

use crate::error::TreeError;
use crate::tree::node::{Node, NodeInfo};
use crate::tree::path;
use crate::types::{NodeId, NodeKind, RemoteHandle};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

const ROOT_ID: NodeId = 1;

struct Slot {
    node: Arc<Node>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

struct Tree {
    slots: HashMap<NodeId, Slot>,
}

impl Tree {
    fn slot(&self, id: NodeId) -> Option<&Slot> {
        self.slots.get(&id)
    }

    fn child_named(&self, dir: NodeId, name: &str) -> Option<NodeId> {
        self.slot(dir)?
            .children
            .iter()
            .copied()
            .find(|child| self.slots.get(child).map(|s| s.node.name()) == Some(name))
    }

    /// Walk a cleaned path from the root by exact name match.
    fn resolve_id(&self, cleaned: &str) -> Option<NodeId> {
        let mut current = ROOT_ID;
        for segment in path::segments(cleaned) {
            current = self.child_named(current, segment)?;
        }
        Some(current)
    }

    fn path_of(&self, id: NodeId) -> Option<String> {
        let mut names = Vec::new();
        let mut current = id;
        loop {
            let slot = self.slot(current)?;
            match slot.parent {
                Some(parent) => {
                    names.push(slot.node.name().to_string());
                    current = parent;
                }
                None => break,
            }
        }
        if names.is_empty() {
            return Some("/".to_string());
        }
        names.reverse();
        Some(format!("/{}", names.join("/")))
    }

    fn count_from(&self, id: NodeId) -> usize {
        match self.slot(id) {
            Some(slot) => 1 + slot.children.iter().map(|c| self.count_from(*c)).sum::<usize>(),
            None => 0,
        }
    }

    fn info(&self, slot: &Slot) -> NodeInfo {
        NodeInfo::snapshot(&slot.node, slot.children.len())
    }

    /// Remove a subtree from the arena, marking every node in it detached.
    /// Returns the dropped nodes, `id` first.
    fn drop_subtree(&mut self, id: NodeId) -> Vec<Arc<Node>> {
        let mut dropped = Vec::new();
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(slot) = self.slots.remove(&current) {
                slot.node.mark_detached();
                pending.extend(slot.children);
                dropped.push(slot.node);
            }
        }
        dropped
    }
}

/// The process-wide namespace shared by every session.
pub struct Namespace {
    tree: RwLock<Tree>,
    root: Arc<Node>,
    next_id: AtomicU64,
}

impl Namespace {
    /// Create a namespace holding only the root directory `/`.
    pub fn new() -> Self {
        let root = Arc::new(Node::new(
            ROOT_ID,
            "/".to_string(),
            NodeKind::Directory,
            RemoteHandle::root(),
            true,
        ));
        let mut slots = HashMap::new();
        slots.insert(
            ROOT_ID,
            Slot {
                node: Arc::clone(&root),
                parent: None,
                children: Vec::new(),
            },
        );
        Self {
            tree: RwLock::new(Tree { slots }),
            root,
            next_id: AtomicU64::new(ROOT_ID + 1),
        }
    }

    pub fn root(&self) -> Arc<Node> {
        Arc::clone(&self.root)
    }

    /// Resolve an absolute path to its node.
    pub fn resolve(&self, full: &str) -> Result<Arc<Node>, TreeError> {
        let cleaned = path::clean(full);
        let tree = self.tree.read();
        tree.resolve_id(&cleaned)
            .and_then(|id| tree.slot(id))
            .map(|slot| Arc::clone(&slot.node))
            .ok_or(TreeError::NotFound(cleaned))
    }

    /// Insert a new, locally created entry. Does not talk to the remote store.
    pub fn insert(&self, full: &str, kind: NodeKind) -> Result<Arc<Node>, TreeError> {
        self.insert_entry(full, kind, true)
    }

    pub(crate) fn insert_entry(
        &self,
        full: &str,
        kind: NodeKind,
        loaded: bool,
    ) -> Result<Arc<Node>, TreeError> {
        let (parent_path, name) = path::split(full);
        if !path::is_valid_name(&name) {
            return Err(TreeError::InvalidName(name));
        }

        let mut tree = self.tree.write();
        let parent_id = if parent_path == "/" {
            ROOT_ID
        } else {
            tree.resolve_id(&parent_path)
                .ok_or_else(|| TreeError::ParentNotFound {
                    parent: parent_path.clone(),
                })?
        };
        let node = self.attach(&mut tree, parent_id, &parent_path, &name, kind, loaded)?;
        debug!(path = %path::join(&parent_path, &name), kind = %kind, "Inserted node");
        Ok(node)
    }

    fn attach(
        &self,
        tree: &mut Tree,
        parent_id: NodeId,
        parent_path: &str,
        name: &str,
        kind: NodeKind,
        loaded: bool,
    ) -> Result<Arc<Node>, TreeError> {
        let parent = tree
            .slot(parent_id)
            .ok_or_else(|| TreeError::ParentNotFound {
                parent: parent_path.to_string(),
            })?;
        if !parent.node.is_dir() {
            return Err(TreeError::NotADirectory(parent_path.to_string()));
        }
        if tree.child_named(parent_id, name).is_some() {
            return Err(TreeError::AlreadyExists(path::join(parent_path, name)));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = parent.node.handle().child(name);
        let node = Arc::new(Node::new(id, name.to_string(), kind, handle, loaded));
        tree.slots.insert(
            id,
            Slot {
                node: Arc::clone(&node),
                parent: Some(parent_id),
                children: Vec::new(),
            },
        );
        if let Some(parent) = tree.slots.get_mut(&parent_id) {
            parent.children.push(id);
        }
        Ok(node)
    }

    /// Insert every `(name, kind)` not already a child of `dir`, in order.
    ///
    /// Runs under a single write lock, so names another session inserted in the
    /// meantime are skipped rather than duplicated. Returns the new nodes.
    pub(crate) fn insert_missing<'a, I>(
        &self,
        dir: &Node,
        entries: I,
    ) -> Result<Vec<Arc<Node>>, TreeError>
    where
        I: IntoIterator<Item = (&'a str, NodeKind)>,
    {
        let mut tree = self.tree.write();
        let dir_path = tree
            .path_of(dir.id())
            .ok_or_else(|| TreeError::NotFound(dir.name().to_string()))?;
        let mut added = Vec::new();
        for (name, kind) in entries {
            if !path::is_valid_name(name) || tree.child_named(dir.id(), name).is_some() {
                continue;
            }
            added.push(self.attach(&mut tree, dir.id(), &dir_path, name, kind, false)?);
        }
        Ok(added)
    }

    /// Detach the entry at `full` from its parent. Does not talk to the remote store.
    pub fn remove(&self, full: &str) -> Result<Arc<Node>, TreeError> {
        let (parent, name) = path::split(full);
        self.remove_tree(full)?
            .into_iter()
            .next()
            .ok_or(TreeError::ChildNotFound { parent, name })
    }

    /// Like [`Namespace::remove`], but returns every node of the detached
    /// subtree, the removed entry first.
    pub fn remove_tree(&self, full: &str) -> Result<Vec<Arc<Node>>, TreeError> {
        let (parent_path, name) = path::split(full);
        let mut tree = self.tree.write();
        let parent_id = if parent_path == "/" {
            ROOT_ID
        } else {
            tree.resolve_id(&parent_path)
                .ok_or_else(|| TreeError::ParentNotFound {
                    parent: parent_path.clone(),
                })?
        };
        let child_id =
            tree.child_named(parent_id, &name)
                .ok_or_else(|| TreeError::ChildNotFound {
                    parent: parent_path.clone(),
                    name: name.clone(),
                })?;
        let detached = self.unlink(&mut tree, parent_id, child_id);
        debug!(path = %path::join(&parent_path, &name), nodes = detached.len(), "Removed node");
        Ok(detached)
    }

    /// Detach a node by identity. Used to roll back a failed create without
    /// touching any other entry that may have taken the same path since.
    pub fn detach(&self, id: NodeId) -> Result<(), TreeError> {
        let mut tree = self.tree.write();
        let parent_id = tree
            .slot(id)
            .and_then(|slot| slot.parent)
            .ok_or_else(|| TreeError::NotFound(format!("node #{}", id)))?;
        self.unlink(&mut tree, parent_id, id);
        Ok(())
    }

    fn unlink(&self, tree: &mut Tree, parent_id: NodeId, child_id: NodeId) -> Vec<Arc<Node>> {
        if let Some(parent) = tree.slots.get_mut(&parent_id) {
            parent.children.retain(|id| *id != child_id);
        }
        tree.drop_subtree(child_id)
    }

    /// Absolute path of a node currently in the namespace.
    pub fn path_of(&self, node: &Node) -> Option<String> {
        self.tree.read().path_of(node.id())
    }

    /// Number of nodes reachable from `node`, counting `node` itself.
    pub fn total_count_from(&self, node: &Node) -> usize {
        self.tree.read().count_from(node.id())
    }

    /// Number of nodes in the whole namespace, counting the root.
    pub fn total_count(&self) -> usize {
        self.total_count_from(&self.root())
    }

    pub fn child_count(&self, node: &Node) -> usize {
        self.tree
            .read()
            .slot(node.id())
            .map(|slot| slot.children.len())
            .unwrap_or(0)
    }

    /// Children of a directory in insertion order.
    pub fn children(&self, dir: &Node) -> Result<Vec<Arc<Node>>, TreeError> {
        let tree = self.tree.read();
        let slot = self.dir_slot(&tree, dir)?;
        Ok(slot
            .children
            .iter()
            .filter_map(|id| tree.slot(*id).map(|s| Arc::clone(&s.node)))
            .collect())
    }

    /// Names of a directory's children in insertion order.
    pub fn child_names(&self, dir: &Node) -> Result<Vec<String>, TreeError> {
        let tree = self.tree.read();
        let slot = self.dir_slot(&tree, dir)?;
        Ok(slot
            .children
            .iter()
            .filter_map(|id| tree.slot(*id).map(|s| s.node.name().to_string()))
            .collect())
    }

    /// Metadata snapshot of a directory's children in insertion order.
    pub fn child_infos(&self, dir: &Node) -> Result<Vec<NodeInfo>, TreeError> {
        let tree = self.tree.read();
        let slot = self.dir_slot(&tree, dir)?;
        Ok(slot
            .children
            .iter()
            .filter_map(|id| tree.slot(*id).map(|s| tree.info(s)))
            .collect())
    }

    fn dir_slot<'t>(&self, tree: &'t Tree, dir: &Node) -> Result<&'t Slot, TreeError> {
        let slot = tree
            .slot(dir.id())
            .ok_or_else(|| TreeError::NotFound(dir.name().to_string()))?;
        if !slot.node.is_dir() {
            return Err(TreeError::NotADirectory(dir.name().to_string()));
        }
        Ok(slot)
    }

    /// Metadata snapshot of a node.
    pub fn info(&self, node: &Node) -> NodeInfo {
        NodeInfo::snapshot(node, self.child_count(node))
    }

    /// Every node reachable from the root, depth first, root first.
    pub fn nodes(&self) -> Vec<Arc<Node>> {
        let tree = self.tree.read();
        let mut out = Vec::with_capacity(tree.slots.len());
        let mut pending = vec![ROOT_ID];
        while let Some(id) = pending.pop() {
            if let Some(slot) = tree.slot(id) {
                out.push(Arc::clone(&slot.node));
                pending.extend(slot.children.iter().rev().copied());
            }
        }
        out
    }

    /// Indented listing of the subtree at `node`; directories end in `/`.
    pub fn render_from(&self, node: &Node) -> String {
        let tree = self.tree.read();
        let mut out = String::new();
        let mut pending = vec![(node.id(), 0usize)];
        while let Some((id, depth)) = pending.pop() {
            let Some(slot) = tree.slot(id) else {
                continue;
            };
            for _ in 0..depth {
                out.push('\t');
            }
            out.push_str(slot.node.name());
            if slot.node.is_dir() && slot.parent.is_some() {
                out.push('/');
            }
            out.push('\n');
            pending.extend(slot.children.iter().rev().map(|c| (*c, depth + 1)));
        }
        out
    }

    pub fn render(&self) -> String {
        self.render_from(&self.root())
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}
