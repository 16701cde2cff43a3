//! Error handling foundation for promptline.
//!
//! This module provides only the `Result` type alias using rootcause.
//! Each crate defines its own error enum in its own error module and
//! returns `Report<ThatError>` from fallible operations.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
