//! The library code for the `combien` static site generator. It turns CSV
//! tables of cities, categories, and prices into a cost-of-living website.
//! The architecture can be generally broken down into three steps:
//!
//! 1. Reading and typing the source tables ([`crate::source`],
//!    [`crate::model`])
//! 2. Joining cities with prices and deriving per-city budgets and
//!    per-country groups ([`crate::join`])
//! 3. Converting the joined data into output files on disk ([`crate::write`],
//!    [`crate::sitemap`])
//!
//! The third step is itself composed of three sub-steps:
//!
//! 1. Building a [`crate::context::Context`] for every page of every locale:
//!    the index, one page per category, per country, and per city
//! 2. Rendering each context with its template ([`crate::render`])
//! 3. Writing the pages, the sitemap, and the robots file, and copying the
//!    static files
//!
//! [`crate::build::build_site`] runs all of it from a
//! [`crate::config::Config`].

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod context;
pub mod join;
pub mod model;
pub mod render;
pub mod sitemap;
pub mod source;
pub mod url;
pub mod util;
pub mod write;
