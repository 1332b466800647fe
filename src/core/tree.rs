//! # Tab Tree Store
//!
//! The tab tree is an arena: a flat `TabId → TabNode` map where parent and
//! children are stored as identifiers, never as references.
//!
//! ```text
//! TreeState
//! ├── nodes: HashMap<TabId, TabNode>   // the arena
//! ├── root_ids: Vec<TabId>             // parentless nodes, insertion order
//! └── active_tab_id: Option<TabId>     // the single active node
//! ```
//!
//! `TabStore` is the only writer. Every operation builds the next `TreeState`
//! off to the side and swaps it in as a fresh `Arc`, so anyone holding a
//! snapshot from `snapshot()` keeps a consistent view no matter what happens
//! afterward.
//!
//! Closing a single tab promotes its children into its place. Closing a
//! subtree deletes the node and every descendant. Whenever the tree would
//! become empty it is reset to a single "Home" root.

use log::debug;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Title given to tabs created without one, until the page reports its own.
pub const LOADING_TITLE: &str = "Loading…";

/// Title of the bootstrap root node.
pub const HOME_TITLE: &str = "Home";

/// Opaque identifier for a tab. Generated once, never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabId(Uuid);

impl TabId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TabId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TabNode {
    pub id: TabId,
    pub parent_id: Option<TabId>,
    pub title: String,
    pub url: String,
    pub children: Vec<TabId>,
    pub is_active: bool,
    pub is_expanded: bool,
}

impl TabNode {
    /// Title for display, falling back to the URL while the title is blank.
    pub fn label(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.url
        } else {
            &self.title
        }
    }
}

/// Partial metadata update. `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataPatch {
    pub title: Option<String>,
    pub url: Option<String>,
}

/// One line of the tree view: a node plus its nesting depth.
#[derive(Clone, Copy, Debug)]
pub struct TreeRow<'a> {
    pub node: &'a TabNode,
    pub depth: usize,
}

/// Immutable snapshot of the whole tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TreeState {
    pub nodes: HashMap<TabId, TabNode>,
    pub root_ids: Vec<TabId>,
    pub active_tab_id: Option<TabId>,
}

impl TreeState {
    /// A single active root pointing at `home_url`.
    pub fn bootstrap(home_url: &str) -> Self {
        let id = TabId::new();
        let node = TabNode {
            id,
            parent_id: None,
            title: HOME_TITLE.to_string(),
            url: home_url.to_string(),
            children: Vec::new(),
            is_active: true,
            is_expanded: true,
        };

        Self {
            nodes: HashMap::from([(id, node)]),
            root_ids: vec![id],
            active_tab_id: Some(id),
        }
    }

    pub fn get(&self, id: TabId) -> Option<&TabNode> {
        self.nodes.get(&id)
    }

    pub fn active(&self) -> Option<&TabNode> {
        self.active_tab_id.and_then(|id| self.nodes.get(&id))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `id` followed by all of its descendants, pre-order.
    pub fn subtree_ids(&self, id: TabId) -> Vec<TabId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            if let Some(node) = self.nodes.get(&current) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Every node, depth-first from the roots.
    pub fn flatten(&self) -> Vec<&TabNode> {
        self.walk(false).into_iter().map(|row| row.node).collect()
    }

    /// Depth-first rows, skipping the children of collapsed nodes.
    pub fn visible_rows(&self) -> Vec<TreeRow<'_>> {
        self.walk(true)
    }

    fn walk(&self, respect_collapse: bool) -> Vec<TreeRow<'_>> {
        let mut rows = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(TabId, usize)> =
            self.root_ids.iter().rev().map(|id| (*id, 0)).collect();

        while let Some((id, depth)) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            rows.push(TreeRow { node, depth });
            if respect_collapse && !node.is_expanded {
                continue;
            }
            stack.extend(node.children.iter().rev().map(|child| (*child, depth + 1)));
        }
        rows
    }

    /// Checks the structural invariants of the tree.
    ///
    /// Returns a description of the first violation found.
    pub fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            if self.root_ids.is_empty() && self.active_tab_id.is_none() {
                return Ok(());
            }
            return Err("empty node map with dangling roots or active id".into());
        }

        if self.root_ids.is_empty() {
            return Err("nodes exist but root_ids is empty".into());
        }

        let mut seen = HashSet::new();
        let mut stack: Vec<(TabId, Option<TabId>)> =
            self.root_ids.iter().map(|id| (*id, None)).collect();
        while let Some((id, expected_parent)) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                return Err(format!("{id} is referenced but missing from nodes"));
            };
            if !seen.insert(id) {
                return Err(format!("{id} is reachable more than once"));
            }
            if node.parent_id != expected_parent {
                return Err(format!(
                    "{id} has parent {:?}, expected {:?}",
                    node.parent_id, expected_parent
                ));
            }
            stack.extend(node.children.iter().map(|child| (*child, Some(id))));
        }

        if seen.len() != self.nodes.len() {
            return Err(format!(
                "{} nodes unreachable from roots",
                self.nodes.len() - seen.len()
            ));
        }

        let active: Vec<TabId> = self
            .nodes
            .values()
            .filter(|node| node.is_active)
            .map(|node| node.id)
            .collect();
        match (active.as_slice(), self.active_tab_id) {
            ([only], Some(id)) if *only == id => Ok(()),
            _ => Err(format!(
                "active flags {:?} disagree with active_tab_id {:?}",
                active, self.active_tab_id
            )),
        }
    }

    /// Moves the active flag to `id`, or clears it everywhere for `None`.
    fn set_active(&mut self, id: Option<TabId>) {
        for node in self.nodes.values_mut() {
            node.is_active = false;
        }
        let id = id.filter(|id| self.nodes.contains_key(id));
        if let Some(node) = id.and_then(|id| self.nodes.get_mut(&id)) {
            node.is_active = true;
        }
        self.active_tab_id = id;
    }
}

/// Single-writer owner of the tab tree.
pub struct TabStore {
    state: Arc<TreeState>,
    home_url: String,
}

impl TabStore {
    pub fn new(home_url: impl Into<String>) -> Self {
        let home_url = home_url.into();
        Self {
            state: Arc::new(TreeState::bootstrap(&home_url)),
            home_url,
        }
    }

    /// The current snapshot. Cheap to clone and never mutated afterward.
    pub fn snapshot(&self) -> Arc<TreeState> {
        Arc::clone(&self.state)
    }

    pub fn state(&self) -> &TreeState {
        &self.state
    }

    pub fn home_url(&self) -> &str {
        &self.home_url
    }

    pub fn active_tab_id(&self) -> Option<TabId> {
        self.state.active_tab_id
    }

    fn commit(&mut self, next: TreeState) {
        debug_assert!(next.validate().is_ok(), "{:?}", next.validate());
        self.state = Arc::new(next);
    }

    /// Opens a tab under `parent_id`, or as a new root when the parent is
    /// absent or unknown. The new tab becomes active.
    pub fn create_tab(
        &mut self,
        parent_id: Option<TabId>,
        url: impl Into<String>,
        title: Option<String>,
    ) -> TabId {
        let mut next = (*self.state).clone();
        let id = TabId::new();
        let url = url.into();

        let parent_id = parent_id.filter(|pid| next.nodes.contains_key(pid));
        match parent_id.and_then(|pid| next.nodes.get_mut(&pid)) {
            Some(parent) => {
                parent.children.push(id);
                parent.is_expanded = true;
            }
            None => next.root_ids.push(id),
        }

        debug!("created tab {id} (parent: {parent_id:?}, url: {url})");

        next.nodes.insert(
            id,
            TabNode {
                id,
                parent_id,
                title: title.unwrap_or_else(|| LOADING_TITLE.to_string()),
                url,
                children: Vec::new(),
                is_active: false,
                is_expanded: true,
            },
        );
        next.set_active(Some(id));

        self.commit(next);
        id
    }

    pub fn activate_tab(&mut self, id: TabId) {
        if !self.state.nodes.contains_key(&id) || self.state.active_tab_id == Some(id) {
            return;
        }
        let mut next = (*self.state).clone();
        next.set_active(Some(id));
        self.commit(next);
    }

    pub fn update_tab_metadata(&mut self, id: TabId, patch: MetadataPatch) {
        if !self.state.nodes.contains_key(&id) {
            return;
        }
        let mut next = (*self.state).clone();
        if let Some(node) = next.nodes.get_mut(&id) {
            if let Some(title) = patch.title {
                node.title = title;
            }
            if let Some(url) = patch.url {
                node.url = url;
            }
        }
        self.commit(next);
    }

    pub fn update_tab_url(&mut self, id: TabId, url: impl Into<String>) {
        self.update_tab_metadata(
            id,
            MetadataPatch {
                title: None,
                url: Some(url.into()),
            },
        );
    }

    pub fn toggle_expanded(&mut self, id: TabId) {
        if !self.state.nodes.contains_key(&id) {
            return;
        }
        let mut next = (*self.state).clone();
        if let Some(node) = next.nodes.get_mut(&id) {
            node.is_expanded = !node.is_expanded;
        }
        self.commit(next);
    }

    /// Removes a single tab, promoting its children into the slot it occupied.
    ///
    /// Returns the tab that is active afterward.
    pub fn close_tab(&mut self, id: TabId) -> Option<TabId> {
        let mut next = (*self.state).clone();
        let Some(node) = next.nodes.remove(&id) else {
            return self.state.active_tab_id;
        };

        let new_parent = node.parent_id.filter(|pid| next.nodes.contains_key(pid));
        match new_parent.and_then(|pid| next.nodes.get_mut(&pid)) {
            Some(parent) => {
                splice_in_place(&mut parent.children, id, &node.children);
                parent.is_expanded = true;
            }
            None => splice_in_place(&mut next.root_ids, id, &node.children),
        }

        for child_id in &node.children {
            if let Some(child) = next.nodes.get_mut(child_id) {
                child.parent_id = new_parent;
            }
        }

        let next_active = if self.state.active_tab_id == Some(id) {
            new_parent
                .or_else(|| node.children.first().copied())
                .or_else(|| next.root_ids.first().copied())
        } else {
            self.state.active_tab_id
        };

        debug!(
            "closed tab {id}, promoted {} children, next active {next_active:?}",
            node.children.len()
        );
        self.finish_removal(next, next_active)
    }

    /// Removes a tab and every descendant.
    ///
    /// Returns the tab that is active afterward.
    pub fn close_subtree(&mut self, id: TabId) -> Option<TabId> {
        let Some(node) = self.state.nodes.get(&id) else {
            return self.state.active_tab_id;
        };
        let parent_id = node.parent_id;

        let removed: HashSet<TabId> = self.state.subtree_ids(id).into_iter().collect();
        let mut next = (*self.state).clone();
        next.nodes.retain(|nid, _| !removed.contains(nid));
        next.root_ids.retain(|rid| !removed.contains(rid));
        if let Some(parent) = parent_id.and_then(|pid| next.nodes.get_mut(&pid)) {
            parent.children.retain(|cid| *cid != id);
        }

        let active_removed = self
            .state
            .active_tab_id
            .is_some_and(|active| removed.contains(&active));
        let next_active = if active_removed {
            parent_id
                .filter(|pid| next.nodes.contains_key(pid))
                .or_else(|| next.root_ids.first().copied())
        } else {
            self.state.active_tab_id
        };

        debug!(
            "closed subtree {id} ({} tabs), next active {next_active:?}",
            removed.len()
        );
        self.finish_removal(next, next_active)
    }

    /// Resets to the bootstrap tree if there are no roots left.
    pub fn ensure_root(&mut self) {
        if self.state.root_ids.is_empty() {
            self.reset();
        }
    }

    fn finish_removal(&mut self, mut next: TreeState, next_active: Option<TabId>) -> Option<TabId> {
        if next.root_ids.is_empty() {
            return self.reset();
        }
        next.set_active(next_active);
        let active = next.active_tab_id;
        self.commit(next);
        active
    }

    fn reset(&mut self) -> Option<TabId> {
        debug!("tree empty, resetting to home root");
        let initial = TreeState::bootstrap(&self.home_url);
        let active = initial.active_tab_id;
        self.commit(initial);
        active
    }
}

/// Replaces `target` in `list` with `replacement`, keeping its position.
fn splice_in_place(list: &mut Vec<TabId>, target: TabId, replacement: &[TabId]) {
    if let Some(index) = list.iter().position(|id| *id == target) {
        list.splice(index..=index, replacement.iter().copied());
    }
}
