//! Utility functions for ptahcms core
//!
//! This module provides common utility functions used across the codebase.

mod naming;

pub use naming::{choose_name, normalize_name};
