//! Report rendering: structured sections for the API response plus an A4
//! PDF for download.

pub mod pdf;
pub mod render;

pub use pdf::render_pdf;
pub use render::{render, ReportBundle};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("{0}")]
    Pdf(String),
}
