//! Paged collection model.
//!
//! `PagedModel` owns a flat list of items fetched page by page from a
//! caller-supplied callback, the data side of a virtualized list view. The
//! view renders [`items`](PagedModel::items) and calls
//! [`load_next`](PagedModel::load_next) when the user scrolls near the end;
//! the model guarantees at most one fetch is in flight, tracks known or
//! deferred totals, and supports reverse-order loading for bottom-up views
//! such as message logs.
//!
//! # Example
//!
//! ```
//! use trellis::model::PagedModel;
//! use std::sync::Arc;
//!
//! # async fn demo() {
//! let model = PagedModel::new(Arc::new(|from, count| {
//!     Box::pin(async move {
//!         Ok((from..from + count).map(|n| format!("row {n}")).collect())
//!     })
//! }));
//! model.set_items_per_load(20);
//! model.set_total(45);
//!
//! while model.load_next().await {}
//! assert_eq!(model.count(), 45);
//! # }
//! ```

use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::RwLock;

use super::error::LoadError;
use super::signals::PagedModelSignals;

/// Page-fetch callback: `(from, count)` in domain order, yielding the items
/// of that page.
pub type PageLoader<T> =
    Arc<dyn Fn(usize, usize) -> BoxFuture<'static, Result<Vec<T>, LoadError>> + Send + Sync>;

/// Default page size when none is configured.
const DEFAULT_ITEMS_PER_LOAD: usize = 50;

struct PagedState<T> {
    /// Everything loaded so far; append-only within one generation.
    items: Vec<T>,
    /// Known total, once available.
    total: Option<usize>,
    /// True while a deferred total is being resolved.
    total_pending: bool,
    /// Page size.
    items_per_load: usize,
    /// Load from the logical tail backward.
    reverse: bool,
    /// True while a page fetch is in flight.
    loading: bool,
    /// Focus index, preserved across appends.
    current: Option<usize>,
    /// Bumped by `reload`; stale completions check it before applying.
    generation: u64,
}

/// A flat collection loaded in pages.
///
/// All methods take `&self`; async methods never hold the internal lock
/// across an await point. Load failures are absorbed: the model stays
/// consistent and retryable, and the failure is surfaced through the
/// `load_failed` signal.
pub struct PagedModel<T> {
    state: RwLock<PagedState<T>>,
    loader: PageLoader<T>,
    signals: PagedModelSignals,
}

impl<T: Send + Sync + 'static> PagedModel<T> {
    /// Creates a model over the given page-fetch callback.
    pub fn new(loader: PageLoader<T>) -> Self {
        Self {
            state: RwLock::new(PagedState {
                items: Vec::new(),
                total: None,
                total_pending: false,
                items_per_load: DEFAULT_ITEMS_PER_LOAD,
                reverse: false,
                loading: false,
                current: None,
                generation: 0,
            }),
            loader,
            signals: PagedModelSignals::new(),
        }
    }

    /// Returns the signals for this model.
    pub fn signals(&self) -> &PagedModelSignals {
        &self.signals
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Number of items loaded so far.
    pub fn count(&self) -> usize {
        self.state.read().items.len()
    }

    /// The known total, if any.
    pub fn total(&self) -> Option<usize> {
        self.state.read().total
    }

    /// True while a page fetch is in flight or a deferred total is still
    /// resolving.
    pub fn is_loading(&self) -> bool {
        let st = self.state.read();
        st.loading || st.total_pending
    }

    /// True once every item the total promises has been loaded.
    pub fn is_complete(&self) -> bool {
        let st = self.state.read();
        st.total.is_some_and(|total| st.items.len() >= total)
    }

    /// Provides read access to the loaded items without cloning them.
    pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.state.read().items)
    }

    /// The focus index, if set. Appends never invalidate it; `reload`
    /// clears it.
    pub fn current_index(&self) -> Option<usize> {
        self.state.read().current
    }

    /// Sets or clears the focus index. Out-of-range values are rejected.
    pub fn set_current_index(&self, index: Option<usize>) -> bool {
        let mut st = self.state.write();
        if let Some(i) = index {
            if i >= st.items.len() {
                return false;
            }
        }
        st.current = index;
        true
    }

    /// Reconfigures the page size for subsequent loads.
    pub fn set_items_per_load(&self, count: usize) {
        self.state.write().items_per_load = count.max(1);
    }

    /// Sets the total item count.
    ///
    /// Idempotent: setting the same value again does not notify.
    pub fn set_total(&self, total: usize) {
        {
            let mut st = self.state.write();
            if st.total == Some(total) {
                return;
            }
            st.total = Some(total);
        }
        self.signals.total_changed.emit(total);
        self.signals.changed.emit(());
    }

    /// Resolves the total from a deferred source, then immediately attempts
    /// the first page load.
    ///
    /// While the total is pending, [`is_loading`](Self::is_loading) reports
    /// `true` and [`load_next`](Self::load_next) refuses to start. A failed
    /// resolution emits `load_failed` and leaves the total unknown.
    pub async fn set_total_deferred(
        &self,
        total: BoxFuture<'_, Result<usize, LoadError>>,
    ) {
        let generation = {
            let mut st = self.state.write();
            st.total_pending = true;
            st.generation
        };
        self.signals.loading_changed.emit(true);
        self.signals.changed.emit(());

        let outcome = total.await;

        let stale = {
            let mut st = self.state.write();
            st.total_pending = false;
            let stale = st.generation != generation;
            if !stale {
                if let Ok(total) = &outcome {
                    st.total = Some(*total);
                }
            }
            stale
        };
        self.signals.loading_changed.emit(false);
        if stale {
            self.signals.changed.emit(());
            return;
        }
        match outcome {
            Ok(total) => {
                tracing::debug!(target: "trellis::model::paged", total, "deferred total resolved");
                self.signals.total_changed.emit(total);
                self.signals.changed.emit(());
                self.load_next().await;
            }
            Err(err) => {
                tracing::warn!(target: "trellis::model::paged", error = %err, "deferred total failed");
                self.signals.load_failed.emit(err.to_string());
                self.signals.changed.emit(());
            }
        }
    }

    /// Switches between forward and reverse loading.
    ///
    /// Changing direction moves the "next page" boundary, so the model
    /// reloads from scratch. Setting the current direction again is a no-op.
    pub async fn set_reverse(&self, reverse: bool) {
        {
            let mut st = self.state.write();
            if st.reverse == reverse {
                return;
            }
            st.reverse = reverse;
        }
        self.reload().await;
    }

    /// Whether pages are currently fetched from the logical tail backward.
    pub fn is_reverse(&self) -> bool {
        self.state.read().reverse
    }

    // -------------------------------------------------------------------------
    // Loading
    // -------------------------------------------------------------------------

    /// Fetches the next page.
    ///
    /// Returns `false` without side effects when the total is unknown, zero,
    /// or still pending; when a fetch is already in flight; or when every
    /// item is already loaded. Otherwise issues exactly one fetch and
    /// returns `true` once it settles — including when the fetch failed, in
    /// which case the items are unchanged, `load_failed` has fired, and the
    /// model is ready to retry.
    ///
    /// In forward mode the next page starts at `items.len()`. In reverse
    /// mode pages walk the domain tail-first and each page is reversed
    /// before appending, so a bottom-up view renders the domain forward.
    pub async fn load_next(&self) -> bool {
        let (from, count, generation) = {
            let mut st = self.state.write();
            if st.loading || st.total_pending {
                return false;
            }
            let Some(total) = st.total else {
                return false;
            };
            if total == 0 || st.items.len() >= total {
                return false;
            }
            let count = st.items_per_load.min(total - st.items.len());
            let from = if st.reverse {
                total - st.items.len() - count
            } else {
                st.items.len()
            };
            st.loading = true;
            (from, count, st.generation)
        };
        self.signals.loading_changed.emit(true);
        self.signals.changed.emit(());
        tracing::debug!(target: "trellis::model::paged", from, count, "fetching page");

        let outcome = (self.loader)(from, count).await;

        let applied = {
            let mut st = self.state.write();
            if st.generation != generation {
                // A reload superseded this fetch; newer state is untouched.
                tracing::debug!(target: "trellis::model::paged", from, count, "discarding stale page");
                return false;
            }
            st.loading = false;
            match outcome {
                Ok(mut page) => {
                    if st.reverse {
                        page.reverse();
                    }
                    let first = st.items.len();
                    st.items.extend(page);
                    Ok((first, st.items.len().saturating_sub(1)))
                }
                Err(err) => Err(err),
            }
        };
        self.signals.loading_changed.emit(false);
        match applied {
            Ok((first, last)) => {
                self.signals.items_appended.emit((first, last));
            }
            Err(err) => {
                tracing::warn!(target: "trellis::model::paged", error = %err, "page fetch failed");
                self.signals.load_failed.emit(err.to_string());
            }
        }
        self.signals.changed.emit(());
        true
    }

    /// Clears all loaded items and issues exactly one fresh load.
    ///
    /// Any in-flight fetch is logically abandoned: its completion will see a
    /// newer generation and be discarded.
    pub async fn reload(&self) {
        {
            let mut st = self.state.write();
            st.generation = st.generation.wrapping_add(1);
            st.items.clear();
            st.current = None;
            st.loading = false;
        }
        self.signals.reset.emit(());
        self.signals.changed.emit(());
        self.load_next().await;
    }

    /// Appends externally produced items (e.g. a live insert at the end of
    /// the collection).
    pub fn append_values(&self, values: Vec<T>) {
        if values.is_empty() {
            return;
        }
        let (first, last) = {
            let mut st = self.state.write();
            let first = st.items.len();
            st.items.extend(values);
            (first, st.items.len() - 1)
        };
        self.signals.items_appended.emit((first, last));
        self.signals.changed.emit(());
    }
}

impl<T: Clone + Send + Sync + 'static> PagedModel<T> {
    /// A snapshot of the loaded items.
    pub fn items(&self) -> Vec<T> {
        self.state.read().items.clone()
    }

    /// The item at `index`, if loaded.
    pub fn get(&self, index: usize) -> Option<T> {
        self.state.read().items.get(index).cloned()
    }
}

static_assertions::assert_impl_all!(PagedModel<String>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Loader over the domain `0..total`, recording every `(from, count)`.
    fn counting_loader(log: Arc<Mutex<Vec<(usize, usize)>>>) -> PageLoader<usize> {
        Arc::new(move |from, count| {
            let log = log.clone();
            Box::pin(async move {
                log.lock().push((from, count));
                Ok((from..from + count).collect())
            })
        })
    }

    #[tokio::test]
    async fn test_forward_loading_page_sizes() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let model = PagedModel::new(counting_loader(log.clone()));
        model.set_items_per_load(20);
        model.set_total(45);

        while model.load_next().await {}

        assert_eq!(model.count(), 45);
        // Exactly three fetches: 20, 20, 5.
        assert_eq!(*log.lock(), vec![(0, 20), (20, 20), (40, 5)]);
        // Fully loaded: further calls refuse.
        assert!(!model.load_next().await);
        assert!(model.is_complete());
    }

    #[tokio::test]
    async fn test_load_next_refuses_without_total() {
        let model = PagedModel::new(counting_loader(Arc::new(Mutex::new(Vec::new()))));
        assert!(!model.load_next().await);

        model.set_total(0);
        assert!(!model.load_next().await);
    }

    #[tokio::test]
    async fn test_reverse_order_round_trip() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let forward = PagedModel::new(counting_loader(log.clone()));
        forward.set_items_per_load(20);
        forward.set_total(45);
        while forward.load_next().await {}

        let reverse = PagedModel::new(counting_loader(log.clone()));
        reverse.set_items_per_load(20);
        reverse.set_total(45);
        reverse.set_reverse(true).await;
        while reverse.load_next().await {}

        // Pages were fetched tail-first...
        assert_eq!(
            log.lock()[3..],
            [(25, 20), (5, 20), (0, 5)]
        );
        // ...and each page reversed on append, so the in-memory sequence is
        // the forward sequence reversed: a bottom-up view renders the same
        // domain order either way.
        let mut mirrored = reverse.items();
        mirrored.reverse();
        assert_eq!(mirrored, forward.items());
    }

    #[tokio::test]
    async fn test_single_fetch_in_flight() {
        let active = Arc::new(AtomicUsize::new(0));
        let active_clone = active.clone();
        let model = PagedModel::new(Arc::new(move |from, count| {
            let active = active_clone.clone();
            Box::pin(async move {
                assert_eq!(active.fetch_add(1, Ordering::SeqCst), 0, "overlapping fetch");
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok((from..from + count).collect::<Vec<usize>>())
            })
        }));
        model.set_items_per_load(10);
        model.set_total(20);

        let (first, second) = futures_util::join!(model.load_next(), model.load_next());
        assert!(first);
        assert!(!second); // second call saw the in-flight fetch and refused
        assert_eq!(model.count(), 10);
    }

    #[tokio::test]
    async fn test_failed_load_is_absorbed() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();
        let model = PagedModel::new(Arc::new(move |from, count| {
            let attempts = attempts_clone.clone();
            Box::pin(async move {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(LoadError::failed("flaky backend"))
                } else {
                    Ok((from..from + count).collect::<Vec<usize>>())
                }
            })
        }));
        model.set_items_per_load(10);
        model.set_total(10);

        let failures = Arc::new(Mutex::new(Vec::new()));
        let failures_clone = failures.clone();
        model.signals().load_failed.connect(move |message| {
            failures_clone.lock().push(message.clone());
        });

        // The fetch was issued (true), but nothing was appended.
        assert!(model.load_next().await);
        assert_eq!(model.count(), 0);
        assert!(!model.is_loading());
        assert_eq!(*failures.lock(), vec!["flaky backend".to_string()]);

        // The model is retryable.
        assert!(model.load_next().await);
        assert_eq!(model.count(), 10);
    }

    #[tokio::test]
    async fn test_reload_discards_stale_page() {
        let model = PagedModel::new(Arc::new(move |from, count| {
            Box::pin(async move {
                tokio::time::sleep(std::time::Duration::from_millis(15)).await;
                Ok((from..from + count).collect::<Vec<usize>>())
            })
        }));
        model.set_items_per_load(10);
        model.set_total(10);

        let stale = model.load_next();
        futures_util::pin_mut!(stale);
        futures_util::poll!(stale.as_mut()); // fetch issued
        assert!(model.is_loading());

        model.reload().await;
        assert_eq!(model.count(), 10);

        // The superseded fetch resolves but is discarded.
        assert!(!stale.await);
        assert_eq!(model.count(), 10);
    }

    #[tokio::test]
    async fn test_deferred_total_triggers_first_load() {
        let model = PagedModel::new(counting_loader(Arc::new(Mutex::new(Vec::new()))));
        model.set_items_per_load(10);

        model
            .set_total_deferred(Box::pin(async {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                Ok(25)
            }))
            .await;

        assert_eq!(model.total(), Some(25));
        assert_eq!(model.count(), 10); // first page loaded automatically
    }

    #[tokio::test]
    async fn test_deferred_total_failure_notifies() {
        let model = PagedModel::new(counting_loader(Arc::new(Mutex::new(Vec::new()))));

        let failures = Arc::new(AtomicUsize::new(0));
        let failures_clone = failures.clone();
        model.signals().load_failed.connect(move |_| {
            failures_clone.fetch_add(1, Ordering::SeqCst);
        });

        model
            .set_total_deferred(Box::pin(async { Err(LoadError::failed("no count")) }))
            .await;

        assert_eq!(model.total(), None);
        assert!(!model.is_loading());
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_total_pending_blocks_load_next() {
        let model = PagedModel::new(counting_loader(Arc::new(Mutex::new(Vec::new()))));
        model.set_total(10);

        let pending = model.set_total_deferred(Box::pin(async {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            Ok(10)
        }));
        futures_util::pin_mut!(pending);
        futures_util::poll!(pending.as_mut());

        assert!(model.is_loading());
        assert!(!model.load_next().await);
        pending.await;
    }

    #[tokio::test]
    async fn test_set_total_idempotent() {
        let model = PagedModel::new(counting_loader(Arc::new(Mutex::new(Vec::new()))));
        let notifications = Arc::new(AtomicUsize::new(0));
        let notifications_clone = notifications.clone();
        model.signals().total_changed.connect(move |_| {
            notifications_clone.fetch_add(1, Ordering::SeqCst);
        });

        model.set_total(45);
        model.set_total(45);
        model.set_total(46);
        assert_eq!(notifications.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_focus_preserved_across_growth_and_cleared_by_reload() {
        let model = PagedModel::new(counting_loader(Arc::new(Mutex::new(Vec::new()))));
        model.set_items_per_load(10);
        model.set_total(30);

        assert!(model.load_next().await);
        assert!(model.set_current_index(Some(3)));
        assert!(!model.set_current_index(Some(99)));

        assert!(model.load_next().await);
        assert_eq!(model.current_index(), Some(3));
        assert_eq!(model.get(3), Some(3));

        model.reload().await;
        assert_eq!(model.current_index(), None);
    }

    #[tokio::test]
    async fn test_append_values() {
        let model = PagedModel::new(counting_loader(Arc::new(Mutex::new(Vec::new()))));
        let appended = Arc::new(Mutex::new(Vec::new()));
        let appended_clone = appended.clone();
        model.signals().items_appended.connect(move |&(first, last)| {
            appended_clone.lock().push((first, last));
        });

        model.append_values(vec![7, 8, 9]);
        model.append_values(Vec::new()); // no-op
        assert_eq!(model.count(), 3);
        assert_eq!(*appended.lock(), vec![(0, 2)]);
    }
}
