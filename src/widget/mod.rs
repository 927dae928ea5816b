pub mod document_pane;
pub mod hud_message;
pub mod side_panel;

pub use document_pane::{DocumentPane, DocumentView};
pub use hud_message::{HudMessage, HudMode};
pub use side_panel::{SidePanel, citation_at};
