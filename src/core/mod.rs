//! # Core Application Logic
//!
//! This module contains Arbor's browsing logic.
//! It knows nothing about any specific UI technology or page renderer.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • TabStore (the tree)  │
//!                    │  • NavigationBridge     │
//!                    │  • Action / update()    │
//!                    │                         │
//!                    │  No rendering. No HTTP. │
//!                    └───────────┬─────────────┘
//!                                │
//!                  ┌─────────────┴─────────────┐
//!                  ▼                           ▼
//!           ┌────────────┐              ┌────────────┐
//!           │    TUI     │              │  Surfaces  │
//!           │  Adapter   │              │ (HTTP host)│
//!           │ (ratatui)  │              │            │
//!           └────────────┘              └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`tree`]: Tab tree, copy-on-write snapshots, the single-writer store
//! - [`bridge`]: Turns surface events into tree updates
//! - [`surface`]: The contract every page-rendering host implements
//! - [`state`]: The `App` struct, all browsing state in one place
//! - [`action`]: The `Action` enum, everything that can happen in the app

pub mod action;
pub mod address;
pub mod bridge;
pub mod config;
pub mod document;
pub mod message;
pub mod state;
pub mod surface;
pub mod tree;
