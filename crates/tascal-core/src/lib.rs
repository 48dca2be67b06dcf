//! # Tascal Core Library
//!
//! The engine behind the Tascal personal planner: deterministic
//! recurrence expansion, per-occurrence override reconciliation, and
//! optimistic mutation routing against a remote record store.
//!
//! ## Features
//!
//! - **Deterministic Expansion**: weekday-set and month-interval
//!   templates materialize the same occurrence sequence on every load
//! - **Override Reconciliation**: durable per-occurrence edits replace
//!   their virtual instances, never duplicating a date
//! - **Typed Identity**: synthetic instance ids are a distinct type from
//!   persisted record ids, so a virtual id can never leak into a foreign key
//! - **Optimistic Mutations**: the in-memory working set is patched
//!   before a write resolves and reverted in one place on failure
//!
//! ## Core Modules
//!
//! - [`db`]: Database connection and schema bootstrap
//! - [`models`]: Row and task structures, value types, classification
//! - [`ident`]: Persisted vs synthetic task identity
//! - [`expand`]: Recurrence expansion
//! - [`materialize`]: Virtual instance materialization
//! - [`reconcile`]: Override reconciliation and collection assembly
//! - [`working_set`]: The indexed in-memory collection
//! - [`store`]: The abstract record store and its SQLite implementation
//! - [`coordinator`]: Mutation classification and routing
//! - [`error`]: Error types
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use tascal_core::coordinator::Coordinator;
//! use tascal_core::models::NewTaskData;
//! use tascal_core::store::SqliteStore;
//! use tascal_core::db;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = db::establish_connection("tascal.db").await?;
//!     let store = SqliteStore::new(pool);
//!     let mut planner = Coordinator::new(store, Uuid::nil());
//!     planner.load().await;
//!
//!     let (task, _) = planner
//!         .create(NewTaskData {
//!             title: "Water the plants".to_string(),
//!             ..Default::default()
//!         })
//!         .await?;
//!     println!("created {}", task.id);
//!
//!     Ok(())
//! }
//! ```

pub mod coordinator;
pub mod db;
pub mod error;
pub mod expand;
pub mod ident;
pub mod materialize;
pub mod models;
pub mod reconcile;
pub mod store;
pub mod working_set;
