//! Hierarchical tree model.
//!
//! `TreeModel` owns a flattened, navigable projection of a recursive tree of
//! [`TreeItem`]s: the ordered sequence of [`TreeItemHolder`]s is exactly the
//! pre-order flattening of every item whose full ancestor chain is open.
//! Collapsing a node removes its descendant holders contiguously; expanding
//! splices its (possibly freshly loaded) children's holders in at the node's
//! position.
//!
//! Children may be literal, produced by a synchronous callback, or produced
//! by an asynchronous callback. Resolver-backed nodes appear collapsed until
//! an explicit [`open`](TreeModel::open) resolves them; resolved children
//! are memoised so later expansions do not re-fetch.
//!
//! Selection is addressed by [`TreePath`], not by holder identity, so it
//! survives projection rebuilds and snapshot replacement. Selecting a path
//! whose ancestors are not yet open expands them one by one, awaiting any
//! asynchronous loads.
//!
//! # Example
//!
//! ```
//! use trellis::model::{TreeItem, TreeModel};
//! use std::sync::Arc;
//!
//! let model = TreeModel::new();
//! model.set_values(Arc::new(vec![
//!     TreeItem::new("docs").with_open(true).with_items(vec![
//!         TreeItem::new("readme"),
//!         TreeItem::new("guides").with_items(vec![TreeItem::new("install")]),
//!     ]),
//! ]));
//!
//! assert_eq!(model.holder_count(), 3); // docs, docs/readme, docs/guides
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::error::LoadError;
use super::item::{AsyncChildLoader, ChildLoader, Children, TreeItem};
use super::path::TreePath;
use super::signals::TreeModelSignals;

/// One visible row of the flattened tree projection.
///
/// Holders are ephemeral snapshots: every structural edit rebuilds the
/// projection, so holders should be re-read after a change notification
/// rather than stored. The `path` is the row's stable identity.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeItemHolder {
    /// Stable address of the item this row represents.
    pub path: TreePath,
    /// Depth in the tree; root items are level 0.
    pub level: usize,
    /// Whether the item is currently expanded.
    pub open: bool,
    /// True while an asynchronous child fetch for this item is outstanding.
    pub loading: bool,
    /// Whether the item can be expanded at all.
    pub has_children: bool,
    /// Display text for the row.
    pub label: String,
}

impl TreeItemHolder {
    /// The item's own key (the last path segment).
    pub fn key(&self) -> &str {
        self.path.leaf().unwrap_or_default()
    }
}

/// Model-owned per-node state, keyed by path.
///
/// Caller-supplied items are never mutated; expand state, in-flight flags,
/// and memoised resolver results all live here.
#[derive(Default)]
struct NodeState {
    open: bool,
    loading: bool,
    resolved: Option<Vec<TreeItem>>,
}

struct TreeState {
    /// Snapshot identity for the `set_values` no-op check.
    source: Option<Arc<Vec<TreeItem>>>,
    /// Working copy of the item tree (mutated only by `update_values`).
    roots: Vec<TreeItem>,
    /// Per-node state side table.
    nodes: HashMap<TreePath, NodeState>,
    /// Current flattened projection.
    holders: Vec<TreeItemHolder>,
    /// Selection targets, by path.
    select_paths: Vec<TreePath>,
    /// Subsequence of `holders` whose paths are selection targets.
    select_holders: Vec<TreeItemHolder>,
    /// Bumped by `set_values`; orphans in-flight async expansions.
    generation: u64,
}

/// What an `open` call has to do, decided under the lock.
enum Expansion {
    Refused,
    Ready,
    Resolve(ChildLoader, TreeItem),
    Fetch(AsyncChildLoader, TreeItem, u64),
}

/// A hierarchical model with lazy loading, expand/collapse, and path-based
/// selection.
///
/// All methods take `&self`; state lives behind an internal lock. Async
/// methods never hold the lock across an await point, so concurrent calls
/// from a single-threaded executor interleave safely: re-entrant expansion
/// of a node that is already loading is a no-op, and at most one child fetch
/// per node is outstanding.
pub struct TreeModel {
    state: RwLock<TreeState>,
    signals: TreeModelSignals,
}

impl Default for TreeModel {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(TreeState {
                source: None,
                roots: Vec::new(),
                nodes: HashMap::new(),
                holders: Vec::new(),
                select_paths: Vec::new(),
                select_holders: Vec::new(),
                generation: 0,
            }),
            signals: TreeModelSignals::new(),
        }
    }

    /// Returns the signals for this model.
    pub fn signals(&self) -> &TreeModelSignals {
        &self.signals
    }

    // -------------------------------------------------------------------------
    // Projection accessors
    // -------------------------------------------------------------------------

    /// A snapshot of the current holder projection.
    pub fn holders(&self) -> Vec<TreeItemHolder> {
        self.state.read().holders.clone()
    }

    /// Provides read access to the holder projection without cloning it.
    pub fn with_holders<R>(&self, f: impl FnOnce(&[TreeItemHolder]) -> R) -> R {
        f(&self.state.read().holders)
    }

    /// Number of visible rows.
    pub fn holder_count(&self) -> usize {
        self.state.read().holders.len()
    }

    /// The holder for the given path, if it is currently visible.
    pub fn find(&self, path: &TreePath) -> Option<TreeItemHolder> {
        self.state
            .read()
            .holders
            .iter()
            .find(|h| h.path == *path)
            .cloned()
    }

    /// Whether the node at `path` is currently expanded.
    pub fn is_open(&self, path: &TreePath) -> bool {
        self.state.read().nodes.get(path).is_some_and(|s| s.open)
    }

    /// The currently selected holders, in projection order.
    ///
    /// Always a subsequence of [`holders`](Self::holders); selection targets
    /// whose subtrees are not yet loaded are not represented here until
    /// their ancestors finish opening.
    pub fn select_holders(&self) -> Vec<TreeItemHolder> {
        self.state.read().select_holders.clone()
    }

    /// The selection targets, whether or not they currently resolve.
    pub fn select_paths(&self) -> Vec<TreePath> {
        self.state.read().select_paths.clone()
    }

    // -------------------------------------------------------------------------
    // Snapshot replacement
    // -------------------------------------------------------------------------

    /// Replaces the root item sequence.
    ///
    /// A call with the same snapshot (`Arc::ptr_eq`) is a no-op; use
    /// [`set_values_forced`](Self::set_values_forced) to rebuild anyway.
    /// Expand state is recomputed from the items' `open` flags, any
    /// in-flight child fetches are orphaned, and selection targets are
    /// retained and re-resolved against the new tree.
    pub fn set_values(&self, roots: Arc<Vec<TreeItem>>) {
        self.replace_values(roots, false);
    }

    /// Replaces the root item sequence even if the snapshot is unchanged.
    pub fn set_values_forced(&self, roots: Arc<Vec<TreeItem>>) {
        self.replace_values(roots, true);
    }

    fn replace_values(&self, roots: Arc<Vec<TreeItem>>, force: bool) {
        let selection = {
            let mut guard = self.state.write();
            let st = &mut *guard;
            if !force && st.source.as_ref().is_some_and(|s| Arc::ptr_eq(s, &roots)) {
                return;
            }
            tracing::debug!(target: "trellis::model::tree", roots = roots.len(), "replacing tree snapshot");
            st.generation = st.generation.wrapping_add(1);
            st.roots = (*roots).clone();
            st.source = Some(roots);
            st.nodes.clear();
            seed_open_flags(&st.roots, &TreePath::root(), &mut st.nodes);
            let before = selection_paths(st);
            rebuild(st);
            selection_delta(before, st)
        };
        self.notify_structure(selection);
    }

    /// Merges a new tree snapshot into the current one.
    ///
    /// Siblings are matched by `value` (as sets, not by position): items
    /// missing from the new tree are removed, new items are appended, and
    /// items present in both are updated in place with their literal
    /// children merged recursively. Expand state and memoised children
    /// survive for every path that still exists.
    pub fn update_values(&self, roots: Vec<TreeItem>) {
        let selection = {
            let mut guard = self.state.write();
            let st = &mut *guard;
            merge_items(&mut st.roots, roots);
            st.source = None;
            seed_open_flags(&st.roots, &TreePath::root(), &mut st.nodes);
            prune_nodes(&st.roots, &mut st.nodes);
            let before = selection_paths(st);
            rebuild(st);
            selection_delta(before, st)
        };
        self.notify_structure(selection);
    }

    // -------------------------------------------------------------------------
    // Expand / collapse
    // -------------------------------------------------------------------------

    /// Expands the item behind `holder`.
    ///
    /// No-op (returning `false`) if the holder is stale, already open, a
    /// leaf, or already loading. Literal and synchronous children expand
    /// immediately. Asynchronous children first set the holder's `loading`
    /// flag and notify (so a view can show a spinner), then splice the
    /// loaded children in when the fetch completes. A failed fetch clears
    /// `loading` and emits `load_failed`, leaving the node closed and
    /// retryable.
    pub async fn open(&self, holder: &TreeItemHolder) -> bool {
        self.open_path(&holder.path).await
    }

    /// Expands the node at `path`. See [`open`](Self::open).
    pub async fn open_path(&self, path: &TreePath) -> bool {
        let expansion = self.begin_expansion(path);
        match expansion {
            Expansion::Refused => false,
            Expansion::Ready => {
                let selection = {
                    let mut guard = self.state.write();
                    let st = &mut *guard;
                    let before = selection_paths(st);
                    st.nodes.entry(path.clone()).or_default().open = true;
                    rebuild(st);
                    selection_delta(before, st)
                };
                self.notify_structure(selection);
                true
            }
            Expansion::Resolve(loader, item) => {
                let children = loader(&item);
                self.apply_resolved(path, children, None)
            }
            Expansion::Fetch(loader, item, generation) => {
                self.signals.loading_changed.emit((path.clone(), true));
                self.signals.holders_changed.emit(());
                self.signals.changed.emit(());
                tracing::debug!(target: "trellis::model::tree", path = %path, "fetching children");
                match loader(&item).await {
                    Ok(children) => self.apply_resolved(path, children, Some(generation)),
                    Err(err) => {
                        self.fail_expansion(path, generation, err);
                        false
                    }
                }
            }
        }
    }

    /// Decides, under the lock, what expanding `path` requires.
    fn begin_expansion(&self, path: &TreePath) -> Expansion {
        let mut guard = self.state.write();
        let st = &mut *guard;
        if !st.holders.iter().any(|h| h.path == *path) {
            return Expansion::Refused; // stale holder
        }
        let node = st.nodes.get(path);
        if node.is_some_and(|s| s.open) {
            return Expansion::Refused;
        }
        if node.is_some_and(|s| s.loading) {
            return Expansion::Refused; // fetch already outstanding
        }
        let cached = node.is_some_and(|s| s.resolved.is_some());
        let Some(item) = find_item(&st.roots, &st.nodes, path) else {
            return Expansion::Refused;
        };
        match &item.children {
            Children::Items(_) => Expansion::Ready,
            _ if cached => Expansion::Ready,
            Children::None => Expansion::Refused,
            Children::Loader(loader) => Expansion::Resolve(loader.clone(), item.clone()),
            Children::Future(loader) => {
                let loader = loader.clone();
                let item = item.clone();
                let generation = st.generation;
                st.nodes.entry(path.clone()).or_default().loading = true;
                rebuild(st);
                Expansion::Fetch(loader, item, generation)
            }
        }
    }

    /// Installs resolved children and opens the node.
    ///
    /// `expected_generation` is `Some` for async completions; a mismatch
    /// means the snapshot was replaced mid-flight and the result is
    /// discarded.
    fn apply_resolved(
        &self,
        path: &TreePath,
        children: Vec<TreeItem>,
        expected_generation: Option<u64>,
    ) -> bool {
        let selection = {
            let mut guard = self.state.write();
            let st = &mut *guard;
            if expected_generation.is_some_and(|g| st.generation != g) {
                tracing::debug!(target: "trellis::model::tree", path = %path, "discarding stale child fetch");
                return false;
            }
            if st.nodes.get(path).is_some_and(|s| s.open) {
                return false;
            }
            if find_item(&st.roots, &st.nodes, path).is_none() {
                // Pruned by update_values while the fetch was in flight.
                st.nodes.remove(path);
                return false;
            }
            let before = selection_paths(st);
            seed_open_flags(&children, path, &mut st.nodes);
            let node = st.nodes.entry(path.clone()).or_default();
            node.resolved = Some(children);
            node.loading = false;
            node.open = true;
            rebuild(st);
            selection_delta(before, st)
        };
        if expected_generation.is_some() {
            self.signals.loading_changed.emit((path.clone(), false));
        }
        self.notify_structure(selection);
        true
    }

    /// Clears the loading flag after a failed async fetch and notifies.
    fn fail_expansion(&self, path: &TreePath, expected_generation: u64, err: LoadError) {
        {
            let mut guard = self.state.write();
            let st = &mut *guard;
            if st.generation != expected_generation {
                return;
            }
            if let Some(node) = st.nodes.get_mut(path) {
                node.loading = false;
            }
            rebuild(st);
        }
        tracing::warn!(target: "trellis::model::tree", path = %path, error = %err, "child fetch failed");
        self.signals.loading_changed.emit((path.clone(), false));
        self.signals.load_failed.emit((path.clone(), err.to_string()));
        self.signals.holders_changed.emit(());
        self.signals.changed.emit(());
    }

    /// Collapses the item behind `holder`.
    ///
    /// No-op (returning `false`) if the holder is stale, already closed, or
    /// is the last row with no visible descendants. The contiguous run of
    /// strictly deeper holders following the row is removed.
    pub fn close(&self, holder: &TreeItemHolder) -> bool {
        self.close_path(&holder.path)
    }

    /// Collapses the node at `path`. See [`close`](Self::close).
    pub fn close_path(&self, path: &TreePath) -> bool {
        let selection = {
            let mut guard = self.state.write();
            let st = &mut *guard;
            let Some(index) = st.holders.iter().position(|h| h.path == *path) else {
                return false;
            };
            if !st.nodes.get(path).is_some_and(|s| s.open) {
                return false;
            }
            let level = st.holders[index].level;
            let mut end = index + 1;
            while end < st.holders.len() && st.holders[end].level > level {
                end += 1;
            }
            if end == index + 1 && index + 1 == st.holders.len() {
                return false; // last row, nothing to remove
            }
            if let Some(node) = st.nodes.get_mut(path) {
                node.open = false;
            }
            let before = selection_paths(st);
            rebuild(st);
            selection_delta(before, st)
        };
        self.notify_structure(selection);
        true
    }

    /// Expands a closed node or collapses an open one.
    pub async fn toggle(&self, holder: &TreeItemHolder) -> bool {
        if self.is_open(&holder.path) {
            self.close_path(&holder.path)
        } else {
            self.open_path(&holder.path).await
        }
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    /// Replaces the selection targets and resolves them.
    ///
    /// Paths are processed in order. For each path, ancestors are expanded
    /// one by one (awaiting asynchronous loads) until the target can appear;
    /// a path whose next ancestor never materialises is silently abandoned,
    /// leaving any ancestors already opened as they are. Afterwards the
    /// selected-holder subsequence is re-derived and `selection_changed`
    /// fires.
    pub async fn set_select(&self, paths: Vec<TreePath>) {
        self.state.write().select_paths = paths.clone();
        for path in &paths {
            for depth in 1..path.len() {
                let ancestor = path.prefix(depth);
                let visible = self
                    .state
                    .read()
                    .holders
                    .iter()
                    .any(|h| h.path == ancestor);
                if !visible {
                    tracing::debug!(target: "trellis::model::tree", path = %path, ancestor = %ancestor, "abandoning selection path");
                    break;
                }
                if !self.is_open(&ancestor) {
                    self.open_path(&ancestor).await;
                    if !self.is_open(&ancestor) {
                        break; // leaf or failed load: the path cannot resolve
                    }
                }
            }
        }
        let selection = {
            let mut guard = self.state.write();
            let st = &mut *guard;
            update_selection(st);
            selection_paths(st)
        };
        self.signals.selection_changed.emit(selection);
        self.signals.changed.emit(());
    }

    /// Fires the structural signals after a mutation, including
    /// `selection_changed` when the resolved selection differs.
    fn notify_structure(&self, selection: Option<Vec<TreePath>>) {
        self.signals.holders_changed.emit(());
        if let Some(paths) = selection {
            self.signals.selection_changed.emit(paths);
        }
        self.signals.changed.emit(());
    }
}

static_assertions::assert_impl_all!(TreeModel: Send, Sync);

// -----------------------------------------------------------------------------
// Pure helpers over the state
// -----------------------------------------------------------------------------

/// The children of `item` that are available without fetching.
fn available_children<'a>(item: &'a TreeItem, node: Option<&'a NodeState>) -> Option<&'a [TreeItem]> {
    match &item.children {
        Children::None => None,
        Children::Items(items) => Some(items),
        Children::Loader(_) | Children::Future(_) => node.and_then(|s| s.resolved.as_deref()),
    }
}

/// Pre-order flattening of every item whose ancestor chain is open.
fn flatten(
    items: &[TreeItem],
    nodes: &HashMap<TreePath, NodeState>,
    parent: &TreePath,
    level: usize,
    out: &mut Vec<TreeItemHolder>,
) {
    for item in items {
        let path = parent.child(&item.value);
        let node = nodes.get(&path);
        let open = node.is_some_and(|s| s.open);
        let loading = node.is_some_and(|s| s.loading);
        out.push(TreeItemHolder {
            path: path.clone(),
            level,
            open,
            loading,
            has_children: item.may_have_children(),
            label: item.display_text().to_string(),
        });
        if open {
            if let Some(children) = available_children(item, node) {
                if !children.is_empty() {
                    flatten(children, nodes, &path, level + 1, out);
                }
            }
        }
    }
}

/// Walks the working tree (through memoised children) to the item at `path`.
fn find_item<'a>(
    roots: &'a [TreeItem],
    nodes: &'a HashMap<TreePath, NodeState>,
    path: &TreePath,
) -> Option<&'a TreeItem> {
    let mut current = roots;
    let mut prefix = TreePath::root();
    let mut found = None;
    for segment in path.segments() {
        let item = current.iter().find(|i| i.value == *segment)?;
        prefix = prefix.child(segment);
        found = Some(item);
        current = available_children(item, nodes.get(&prefix)).unwrap_or(&[]);
    }
    found
}

/// Creates open side-table entries for items whose `open` flag is set.
///
/// Only vacant entries are created: existing state always wins, so a
/// re-merge never flips a node the user collapsed back open. The flag is
/// honored only for literal children; a resolver-backed node stays
/// collapsed until an explicit `open` resolves it, whatever its flag says.
fn seed_open_flags(
    items: &[TreeItem],
    parent: &TreePath,
    nodes: &mut HashMap<TreePath, NodeState>,
) {
    for item in items {
        let path = parent.child(&item.value);
        if let Children::Items(children) = &item.children {
            if item.open && !nodes.contains_key(&path) {
                nodes.insert(
                    path.clone(),
                    NodeState {
                        open: true,
                        ..NodeState::default()
                    },
                );
            }
            seed_open_flags(children, &path, nodes);
        }
    }
}

/// Drops side-table entries whose paths no longer resolve in the tree.
fn prune_nodes(roots: &[TreeItem], nodes: &mut HashMap<TreePath, NodeState>) {
    let paths: Vec<TreePath> = nodes.keys().cloned().collect();
    for path in paths {
        if find_item(roots, nodes, &path).is_none() {
            nodes.remove(&path);
        }
    }
}

/// Merges `next` into `prev`: removed siblings dropped, fresh ones appended,
/// matches updated in place with literal children merged recursively.
fn merge_items(prev: &mut Vec<TreeItem>, next: Vec<TreeItem>) {
    prev.retain(|p| next.iter().any(|n| n.value == p.value));
    let mut fresh = Vec::new();
    for incoming in next {
        if let Some(existing) = prev.iter_mut().find(|p| p.value == incoming.value) {
            existing.label = incoming.label;
            if let (Children::Items(old), Children::Items(new)) =
                (&mut existing.children, incoming.children)
            {
                merge_items(old, new);
            }
        } else {
            fresh.push(incoming);
        }
    }
    prev.extend(fresh);
}

/// Recomputes the projection and the resolved selection.
fn rebuild(st: &mut TreeState) {
    let mut out = Vec::new();
    flatten(&st.roots, &st.nodes, &TreePath::root(), 0, &mut out);
    st.holders = out;
    update_selection(st);
}

/// Re-derives the selected-holder subsequence from the selection targets.
fn update_selection(st: &mut TreeState) {
    let selected: Vec<TreeItemHolder> = st
        .holders
        .iter()
        .filter(|h| st.select_paths.contains(&h.path))
        .cloned()
        .collect();
    st.select_holders = selected;
}

/// The paths of the currently resolved selection.
fn selection_paths(st: &TreeState) -> Vec<TreePath> {
    st.select_holders.iter().map(|h| h.path.clone()).collect()
}

/// `Some(new selection)` if the resolved selection changed relative to
/// `before`, for conditional `selection_changed` emission.
fn selection_delta(before: Vec<TreePath>, st: &TreeState) -> Option<Vec<TreePath>> {
    let after = selection_paths(st);
    (after != before).then_some(after)
}
