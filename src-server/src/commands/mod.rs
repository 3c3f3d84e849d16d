//! Commands Layer
//!
//! axum handlers that bridge HTTP requests to the ledger, receipt storage
//! and OCR.

mod error;
mod auth_cmd;
mod db_cmd;
mod files_cmd;
mod ocr_cmd;

pub use error::ApiError;
pub use auth_cmd::*;
pub use db_cmd::*;
pub use files_cmd::*;
pub use ocr_cmd::*;
