// Certificate PDF composition: overlay rendering on built-in fonts and
// stamping onto the uploaded template with lopdf.
pub mod fonts;
pub mod layout;
pub mod merge;
pub mod overlay;

pub use fonts::{unencodable, FontSet};
pub use merge::{merge_overlays, TemplatePdf};
pub use overlay::{render_program_page, render_statement_page, OverlayPage, PageSize, ProgramPage};
