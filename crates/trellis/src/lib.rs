//! Trellis: the model/state layer of a Model/View widget architecture.
//!
//! Trellis owns the data side of list, tree, dropdown, and property-sheet
//! widgets. A view layer (not part of this crate) renders the projections
//! the models expose and forwards user intents (select, open, scroll near
//! the end) back into the models, which update state and notify subscribers
//! through [`trellis_core::Signal`]s.
//!
//! # Components
//!
//! - [`model::TreeModel`]: a flattened, navigable projection of a recursive
//!   item tree, with lazy (sync or async) child loading, expand/collapse,
//!   multi-path selection, and structural diffing across snapshots.
//! - [`model::PagedModel`]: a windowed collection loaded in pages from a
//!   caller-supplied fetch callback, with known or deferred totals and
//!   reverse-order loading.
//! - [`expr`]: a compiler and interpreter for the small expression language
//!   (`$var`, `func(...)`, string literals) used for computed column values.
//!
//! # Example
//!
//! ```
//! use trellis::model::{TreeItem, TreeModel};
//! use std::sync::Arc;
//!
//! let model = TreeModel::new();
//! model.set_values(Arc::new(vec![
//!     TreeItem::new("root")
//!         .with_open(true)
//!         .with_items(vec![TreeItem::new("child")]),
//! ]));
//!
//! let holders = model.holders();
//! assert_eq!(holders.len(), 2);
//! assert_eq!(holders[1].path.to_string(), "root/child");
//! ```

pub mod expr;
pub mod model;

/// Convenience re-exports for the common surface.
pub mod prelude {
    pub use crate::expr::{Compiled, Functions, Value, Variables, compile, evaluate};
    pub use crate::model::{
        Children, LoadError, PagedModel, TreeItem, TreeItemHolder, TreeModel, TreePath,
    };
    pub use trellis_core::Signal;
}
