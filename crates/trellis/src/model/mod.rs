//! Model layer for Trellis widgets.
//!
//! This module provides the state-owning halves of the Model/View pattern,
//! which separates data bookkeeping from display logic. This enables:
//!
//! - Multiple views of the same data
//! - Lazy loading of large or remote data sets
//! - Efficient updates via change notifications
//! - Stable addressing of hierarchical items across rebuilds
//!
//! # Core Types
//!
//! - `TreeItem`: a caller-supplied node of a recursive tree
//! - `TreePath`: an item's stable address (key sequence from a root)
//! - `TreeItemHolder`: one visible row of the flattened tree projection
//! - `TreeModel`: the hierarchical model that owns the projection
//! - `PagedModel`: a flat collection fetched page by page
//!
//! # Example
//!
//! ```
//! use trellis::model::{TreeItem, TreeModel, TreePath};
//! use std::sync::Arc;
//!
//! let model = TreeModel::new();
//! model.set_values(Arc::new(vec![
//!     TreeItem::new("animals").with_open(true).with_items(vec![
//!         TreeItem::new("cats"),
//!         TreeItem::new("dogs"),
//!     ]),
//! ]));
//!
//! // The projection is a pre-order flattening of every open node.
//! let rows: Vec<String> = model
//!     .holders()
//!     .iter()
//!     .map(|h| h.path.to_string())
//!     .collect();
//! assert_eq!(rows, ["animals", "animals/cats", "animals/dogs"]);
//!
//! // Connect to change notifications
//! model.signals().changed.connect(|_| {
//!     println!("model changed");
//! });
//! ```
//!
//! Views query models for their current projection and listen for signals;
//! they never mutate model state directly. Arrays returned by accessor
//! methods are snapshots; mutating them has no effect on the model.

mod error;
mod item;
mod paged;
mod path;
mod signals;
mod tree;

pub use error::LoadError;
pub use item::{AsyncChildLoader, ChildLoader, Children, TreeItem};
pub use paged::{PageLoader, PagedModel};
pub use path::TreePath;
pub use signals::{PagedModelSignals, TreeModelSignals};
pub use tree::{TreeItemHolder, TreeModel};
