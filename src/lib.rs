//! The library code for the `catgen` category page generator. A generation
//! pass (see [`crate::build`]) breaks down into four steps:
//!
//! 1. Parsing posts from source files on disk ([`crate::parser`])
//! 2. Loading the layout templates ([`crate::layout`])
//! 3. Grouping the posts by category and rendering one page per category
//!    ([`crate::index`])
//! 4. Writing the pages to disk ([`crate::write`])
//!
//! The third step is the heart of it. Each category that at least one post
//! lists gets exactly one page, at `categories/{category}/index.html` (or
//! `categories/{category}.html` in the flat style). If the layout for the
//! chosen style isn't present, the site is assumed not to want category pages
//! and nothing is generated.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod category;
pub mod config;
pub mod index;
pub mod layout;
pub mod parser;
pub mod post;
pub mod write;
