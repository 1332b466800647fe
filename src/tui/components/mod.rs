//! # TUI Components
//!
//! All UI components for the terminal interface.
//!
//! ### Stateless Components (Props-Based Rendering)
//!
//! - `Toolbar`: navigation indicators and the address text
//! - `StatusBar`: status message and key hints
//!
//! ### Stateful Components (Event-Driven)
//!
//! Each keeps its persistent state in a `*State` struct owned by `TuiState`
//! and implements `EventHandler` on that state:
//!
//! - `TabTree` / `TabTreeState`: the tab forest, selection, close/expand keys
//! - `AddressBarState`: address editing buffer and cursor
//! - `PageView` / `PageViewState`: document text, scroll, link selection
//!
//! Components receive external data as props, never by reaching into `App`.
//!
//! ```text
//! components/
//! ├── mod.rs         (this file)
//! ├── tab_tree.rs    (left pane)
//! ├── toolbar.rs     (navigation + address bar)
//! ├── page_view.rs   (rendered document)
//! └── status_bar.rs  (bottom line)
//! ```

pub mod page_view;
pub mod status_bar;
pub mod tab_tree;
pub mod toolbar;

pub use page_view::{PageEvent, PageView, PageViewState};
pub use status_bar::StatusBar;
pub use tab_tree::{TabTree, TabTreeState, TreeEvent};
pub use toolbar::{AddressBarState, AddressEvent, Toolbar};
