//! Link bookkeeping for deployment comments.
//!
//! - Text-pattern URL extraction from small, tool-generated HTML (`extract`)
//! - Exact-match duplicate detection for a candidate deployment URL (`dedup`)
//!
//! Neither module builds a DOM; anything that looks like an `http(s)://`
//! token counts, whatever tag it sits in.

pub mod dedup;
pub mod extract;

pub use dedup::{contains_link, is_duplicate};
pub use extract::extract_urls;
