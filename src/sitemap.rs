//! Support for the `sitemap.xml` and `robots.txt` documents. Both are
//! rendered through [`crate::render::Renderer`] with the
//! [`TemplateKind::Sitemap`] and [`TemplateKind::Robots`] templates.

use crate::context::{Context, ContextValue};
use crate::render::{Renderer, Result, TemplateKind};
use url::{ParseError, Url};

/// The file name of the sitemap, relative to the output root.
pub const SITEMAP_FILE: &str = "sitemap.xml";

/// The file name of the robots document, relative to the output root.
pub const ROBOTS_FILE: &str = "robots.txt";

/// Returns the sitemap's absolute URL under `site_root`.
pub fn sitemap_url(site_root: &Url) -> std::result::Result<Url, ParseError> {
    site_root.join(SITEMAP_FILE)
}

/// The sitemap context: `urls` holds `root` followed by `pages`, in order.
/// `pages` must not contain `root`.
pub fn sitemap_context(root: &Url, pages: &[Url]) -> Context {
    let mut urls = Vec::with_capacity(pages.len() + 1);
    urls.push(ContextValue::from(root));
    urls.extend(pages.iter().map(ContextValue::from));
    Context::new().with("urls", ContextValue::List(urls))
}

/// The robots context: just `sitemap_url`.
pub fn robots_context(sitemap_url: &Url) -> Context {
    Context::new().with("sitemap_url", sitemap_url)
}

/// Renders the sitemap document for `root` and `pages`.
pub fn render_sitemap(renderer: &Renderer, root: &Url, pages: &[Url]) -> Result<String> {
    renderer.render(TemplateKind::Sitemap, &sitemap_context(root, pages))
}

/// Renders the robots document pointing at `sitemap_url`.
pub fn render_robots(renderer: &Renderer, sitemap_url: &Url) -> Result<String> {
    renderer.render(TemplateKind::Robots, &robots_context(sitemap_url))
}
