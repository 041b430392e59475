mod api;
mod form;
mod pages;

pub use api::inspect_workbook;
pub use pages::{generate, index};
