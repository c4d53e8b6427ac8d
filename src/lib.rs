//! Data-sync layer and terminal front end for an LLM evaluation dashboard.
//!
//! [`api`] talks to the backend, [`store`] caches and paginates its responses
//! keyed by the [`selection`] cells, and [`table`] renders rows through column
//! descriptors built in [`views`].

pub mod api;
pub mod config;
pub mod error;
pub mod interactive;
pub mod models;
pub mod output;
pub mod pagination;
pub mod query;
pub mod runner;
pub mod selection;
pub mod store;
pub mod table;
pub mod views;
