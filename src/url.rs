//! Computes page locations: the relative output path of a page and its
//! absolute URL for a given locale.

use url::{ParseError, Url};

/// Identifies a generated page independently of its locale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PageId<'a> {
    Index,
    Category(&'a str),
    Country(&'a str),
    City(&'a str),
}

impl PageId<'_> {
    /// The page's path relative to its locale's root directory, e.g.,
    /// `index.html` or `cities/paris.html`.
    pub fn relative_path(&self) -> String {
        match self {
            PageId::Index => String::from("index.html"),
            PageId::Category(slug) => format!("categories/{}.html", slug),
            PageId::Country(slug) => format!("countries/{}.html", slug),
            PageId::City(slug) => format!("cities/{}.html", slug),
        }
    }

    // The index page is addressed by its directory.
    fn url_path(&self) -> String {
        match self {
            PageId::Index => String::new(),
            _ => self.relative_path(),
        }
    }
}

/// The directories that hold entity pages, relative to a locale root.
pub const PAGE_DIRECTORIES: [&str; 3] = ["categories", "countries", "cities"];

/// Returns `url` with a trailing slash on its path. [`Url::join`] treats the
/// last path segment as a file name unless it ends in a slash, so
/// `https://example.org/site` joined with `cities/paris.html` would lose
/// `site`.
pub fn directory_url(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Builds absolute page URLs for one locale.
#[derive(Clone, Debug)]
pub struct LocaleUrls {
    root: Url,
}

impl LocaleUrls {
    /// Creates the URL builder for a locale. The primary locale (`prefix` is
    /// `None`) lives at `site_url`; other locales live at
    /// `{site_url}/{prefix}/`.
    pub fn new(site_url: &Url, prefix: Option<&str>) -> Result<LocaleUrls, ParseError> {
        let site_root = directory_url(site_url);
        Ok(LocaleUrls {
            root: match prefix {
                None => site_root,
                Some(prefix) => site_root.join(&format!("{}/", prefix))?,
            },
        })
    }

    /// The locale's root URL, which is also the URL of its index page.
    pub fn root(&self) -> &Url {
        &self.root
    }

    /// The absolute URL of `page` in this locale.
    pub fn page(&self, page: PageId) -> Result<Url, ParseError> {
        self.root.join(&page.url_path())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_relative_paths() {
        assert_eq!("index.html", PageId::Index.relative_path());
        assert_eq!("categories/loyer.html", PageId::Category("loyer").relative_path());
        assert_eq!("countries/france.html", PageId::Country("france").relative_path());
        assert_eq!("cities/paris.html", PageId::City("paris").relative_path());
    }

    #[test]
    fn test_primary_locale_urls() -> Result<(), ParseError> {
        let urls = LocaleUrls::new(&Url::parse("https://example.org")?, None)?;
        assert_eq!("https://example.org/", urls.root().as_str());
        assert_eq!("https://example.org/", urls.page(PageId::Index)?.as_str());
        assert_eq!(
            "https://example.org/cities/paris.html",
            urls.page(PageId::City("paris"))?.as_str()
        );
        Ok(())
    }

    #[test]
    fn test_secondary_locale_urls_under_subpath() -> Result<(), ParseError> {
        let urls = LocaleUrls::new(&Url::parse("https://example.org/site")?, Some("en"))?;
        assert_eq!("https://example.org/site/en/", urls.page(PageId::Index)?.as_str());
        assert_eq!(
            "https://example.org/site/en/countries/france.html",
            urls.page(PageId::Country("france"))?.as_str()
        );
        Ok(())
    }
}
