//! Caller-supplied tree items.
//!
//! `TreeItem` is the raw domain node handed to a [`TreeModel`]: a key, an
//! optional display label, an initial expand flag, and a children source.
//! Items are plain data; the model never mutates them. All per-node mutable
//! state (open, loading, resolved children) lives in the model's own side
//! table keyed by [`TreePath`], so the same items can back several models
//! without aliasing hazards.
//!
//! [`TreeModel`]: super::TreeModel
//! [`TreePath`]: super::TreePath

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use super::error::LoadError;

/// Synchronous children resolver.
pub type ChildLoader = Arc<dyn Fn(&TreeItem) -> Vec<TreeItem> + Send + Sync>;

/// Asynchronous children resolver.
pub type AsyncChildLoader =
    Arc<dyn Fn(&TreeItem) -> BoxFuture<'static, Result<Vec<TreeItem>, LoadError>> + Send + Sync>;

/// Where an item's children come from.
///
/// Resolver-backed children appear collapsed until the model resolves them
/// through an explicit `open`, regardless of the item's initial open flag.
#[derive(Clone, Default)]
pub enum Children {
    /// A leaf: the item can never have children.
    #[default]
    None,
    /// A literal, already-resolved child sequence.
    Items(Vec<TreeItem>),
    /// Children produced on demand by a synchronous callback.
    Loader(ChildLoader),
    /// Children produced on demand by an asynchronous callback.
    Future(AsyncChildLoader),
}

impl fmt::Debug for Children {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Items(items) => f.debug_tuple("Items").field(&items.len()).finish(),
            Self::Loader(_) => f.write_str("Loader"),
            Self::Future(_) => f.write_str("Future"),
        }
    }
}

/// One node of a caller-supplied item tree.
///
/// `value` is the item's key and must be unique among its siblings; the
/// model joins keys into [`TreePath`](super::TreePath)s for addressing.
///
/// # Example
///
/// ```
/// use trellis::model::{Children, TreeItem};
///
/// let item = TreeItem::new("fruits")
///     .with_label("Fruits")
///     .with_open(true)
///     .with_items(vec![TreeItem::new("apple"), TreeItem::new("pear")]);
///
/// assert_eq!(item.value, "fruits");
/// assert!(matches!(item.children, Children::Items(ref v) if v.len() == 2));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TreeItem {
    /// Key, unique within the item's siblings.
    pub value: String,
    /// Display text; views fall back to `value` when absent.
    pub label: Option<String>,
    /// Initial expand state, honored when a snapshot is (re)loaded.
    pub open: bool,
    /// Children source.
    pub children: Children,
}

impl TreeItem {
    /// Creates a leaf item with the given key.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: None,
            open: false,
            children: Children::None,
        }
    }

    /// Sets the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the initial expand state.
    pub fn with_open(mut self, open: bool) -> Self {
        self.open = open;
        self
    }

    /// Supplies literal children.
    pub fn with_items(mut self, items: Vec<TreeItem>) -> Self {
        self.children = Children::Items(items);
        self
    }

    /// Supplies a synchronous children resolver.
    pub fn with_loader<F>(mut self, loader: F) -> Self
    where
        F: Fn(&TreeItem) -> Vec<TreeItem> + Send + Sync + 'static,
    {
        self.children = Children::Loader(Arc::new(loader));
        self
    }

    /// Supplies an asynchronous children resolver.
    pub fn with_future_loader<F>(mut self, loader: F) -> Self
    where
        F: Fn(&TreeItem) -> BoxFuture<'static, Result<Vec<TreeItem>, LoadError>>
            + Send
            + Sync
            + 'static,
    {
        self.children = Children::Future(Arc::new(loader));
        self
    }

    /// The display text: the label when set, the key otherwise.
    pub fn display_text(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.value)
    }

    /// Whether this item can ever have children.
    pub fn may_have_children(&self) -> bool {
        match &self.children {
            Children::None => false,
            Children::Items(items) => !items.is_empty(),
            Children::Loader(_) | Children::Future(_) => true,
        }
    }
}
