//! Change-notification bundles for the models.
//!
//! Views connect to these signals to stay synchronized with a model. Each
//! bundle carries granular signals for specific kinds of change plus one
//! coalesced `changed` signal that fires at most once per mutating public
//! call, so a view that only wants "something changed, re-read the
//! projection" can connect to a single slot.

use trellis_core::Signal;

use super::path::TreePath;

/// Signals emitted by [`TreeModel`](super::TreeModel).
pub struct TreeModelSignals {
    /// The holder projection was rebuilt (structure, labels, or levels may
    /// differ).
    pub holders_changed: Signal<()>,

    /// The resolved selection changed. Args: the selected paths that
    /// currently resolve to visible holders.
    pub selection_changed: Signal<Vec<TreePath>>,

    /// A node's async child fetch started (`true`) or settled (`false`).
    /// Args: (node path, loading).
    pub loading_changed: Signal<(TreePath, bool)>,

    /// An async child fetch failed. Args: (node path, error message).
    /// The node is left closed with its loading flag cleared.
    pub load_failed: Signal<(TreePath, String)>,

    /// Coalesced notification: fired once at the end of every mutating
    /// public call that changed anything.
    pub changed: Signal<()>,
}

impl Default for TreeModelSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeModelSignals {
    /// Creates a new set of tree model signals.
    pub fn new() -> Self {
        Self {
            holders_changed: Signal::new(),
            selection_changed: Signal::new(),
            loading_changed: Signal::new(),
            load_failed: Signal::new(),
            changed: Signal::new(),
        }
    }
}

/// Signals emitted by [`PagedModel`](super::PagedModel).
pub struct PagedModelSignals {
    /// Items were appended. Args: (first index, last index) of the new run.
    pub items_appended: Signal<(usize, usize)>,

    /// The model was cleared by a reload (items and focus dropped).
    pub reset: Signal<()>,

    /// The total item count became known or changed. Args: the new total.
    pub total_changed: Signal<usize>,

    /// A page fetch (or deferred total) started (`true`) or settled
    /// (`false`).
    pub loading_changed: Signal<bool>,

    /// A page fetch or deferred total failed. Args: the error message.
    /// Items are unchanged and the model is retryable.
    pub load_failed: Signal<String>,

    /// Coalesced notification: fired once at the end of every mutating
    /// public call that changed anything.
    pub changed: Signal<()>,
}

impl Default for PagedModelSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl PagedModelSignals {
    /// Creates a new set of paged model signals.
    pub fn new() -> Self {
        Self {
            items_appended: Signal::new(),
            reset: Signal::new(),
            total_changed: Signal::new(),
            loading_changed: Signal::new(),
            load_failed: Signal::new(),
            changed: Signal::new(),
        }
    }
}
