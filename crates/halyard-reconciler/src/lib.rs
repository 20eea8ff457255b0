//! halyard-reconciler
//!
//! Desired/actual reconciliation engine for Cloud Monitoring resources.
//!
//! Public API:
//! - `apply()`: validate, fetch, diff, plan, actuate, then confirm by re-reading
//! - `get()`: current state of one resource
//! - `list()` / `list_with_page_size()`: pull-based pagination
//! - `delete()` / `delete_all()`: delete and wait for the resource to disappear
//! - `diff()` / `plan()`: the pure steps, usable on their own for previews

pub mod actuate;
pub mod apply;
pub mod cancel;
pub mod canonicalize;
pub mod client;
pub mod config;
pub mod delete;
pub mod diff;
pub mod error;
pub mod fetch;
pub mod list;
pub mod options;
pub mod plan;
pub mod resources;
pub mod url;

pub use crate::apply::apply;
pub use crate::cancel::{CancelHandle, CancelSignal, cancel_pair};
pub use crate::client::Client;
pub use crate::config::Config;
pub use crate::delete::{delete, delete_all};
pub use crate::diff::{FieldDiff, ResultingOperation, diff};
pub use crate::error::ReconcileError;
pub use crate::fetch::get;
pub use crate::list::{ResourceList, list, list_with_page_size};
pub use crate::options::{ApplyOptions, Lifecycle};
pub use crate::plan::{ApiOperation, plan};
