// Export modules for use in tests
pub mod app;
pub mod citation;
pub mod compositor;
pub mod event_source;
pub mod export;
pub mod highlight;
pub mod panic_handler;
pub mod pdf;
pub mod records;
pub mod section;
pub mod settings;
pub mod theme;
pub mod widget;

pub mod test_utils;

// Re-export main app components
pub use app::{App, AppAction, run_app};
pub use compositor::DualPaneCompositor;
pub use highlight::{DocRect, HighlightKind, HighlightRegion};
pub use pdf::{DocumentSource, ViewerSession};
