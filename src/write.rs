use crate::context::*;
use crate::join::{Country, JoinedCityView};
use crate::model::CategoryRecord;
use crate::render::{Error as RenderError, Renderer, TemplateKind};
use crate::url::PageId;
use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::{ParseError, Url};

/// Responsible for templating pages and writing them to disk.
pub struct Writer<'a> {
    /// The renderer with the site's templates.
    pub renderer: &'a Renderer,

    /// The root of the output tree. [`Page::file_path`] is relative to it.
    pub output_directory: &'a Path,

    /// Directories already created during this run.
    seen_dirs: HashSet<PathBuf>,
}

impl<'a> Writer<'a> {
    pub fn new(renderer: &'a Renderer, output_directory: &'a Path) -> Writer<'a> {
        Writer {
            renderer,
            output_directory,
            seen_dirs: HashSet::new(),
        }
    }

    /// Takes a single [`Page`], templates it, and writes it to disk.
    pub fn write_page(&mut self, page: &Page) -> Result<()> {
        let contents = self.renderer.render(page.kind, &page.context)?;
        self.write_document(&page.file_path, &contents)
    }

    /// Writes `contents` to `relative_path` under the output directory,
    /// creating parent directories as needed.
    pub fn write_document(&mut self, relative_path: &Path, contents: &str) -> Result<()> {
        let path = self.output_directory.join(relative_path);
        if let Some(dir) = path.parent() {
            if self.seen_dirs.insert(dir.to_owned()) {
                std::fs::create_dir_all(dir)?;
            }
        }
        debug!(path = %path.display(), "writing");
        std::fs::write(&path, contents)?;
        Ok(())
    }

    /// Writes every page in `pages` and returns their URLs in order.
    pub fn write_pages(&mut self, pages: &[Page]) -> Result<Vec<Url>> {
        let mut urls = Vec::with_capacity(pages.len());
        for page in pages {
            self.write_page(page)?;
            urls.push(page.url.clone());
        }
        Ok(urls)
    }
}

/// An output HTML file: what to render, with which template, and where.
pub struct Page {
    /// The template with which the page will be rendered.
    pub kind: TemplateKind,

    /// The target location of the output file, relative to the output
    /// directory.
    pub file_path: PathBuf,

    /// The page's absolute URL.
    pub url: Url,

    /// The values handed to the template.
    pub context: Context,
}

/// The joined data a page set is built from.
pub struct Site<'a> {
    /// One view per city, in city-table order.
    pub views: &'a [JoinedCityView<'a>],

    /// The categories, in table order. Empty for the flat schema, in which
    /// case no category pages are built.
    pub categories: &'a [CategoryRecord],

    /// The country groups, sorted for display.
    pub countries: &'a [Country<'a>],
}

impl Site<'_> {
    /// The number of pages [`locale_pages`] produces for one locale.
    pub fn page_count(&self) -> usize {
        1 + self.categories.len() + self.countries.len() + self.views.len()
    }
}

/// Creates all of the [`Page`]s of one locale: the index page, then
/// category, country, and city pages. `prefix` is the locale's directory
/// (`None` for the primary locale, which lives at the output root).
pub fn locale_pages(site: &Site, meta: &PageMeta, prefix: Option<&str>) -> Result<Vec<Page>> {
    let file_path = |page: PageId| match prefix {
        None => PathBuf::from(page.relative_path()),
        Some(prefix) => Path::new(prefix).join(page.relative_path()),
    };

    let mut pages = Vec::with_capacity(site.page_count());
    pages.push(Page {
        kind: TemplateKind::Index,
        file_path: file_path(PageId::Index),
        url: meta.urls.page(PageId::Index)?,
        context: index_context(meta, site.categories, site.countries, site.views)?,
    });

    for (i, category) in site.categories.iter().enumerate() {
        let id = PageId::Category(&category.slug);
        pages.push(Page {
            kind: TemplateKind::Category,
            file_path: file_path(id),
            url: meta.urls.page(id)?,
            context: category_context(meta, category, i, site.views)?,
        });
    }

    for country in site.countries {
        let id = PageId::Country(country.slug);
        pages.push(Page {
            kind: TemplateKind::Country,
            file_path: file_path(id),
            url: meta.urls.page(id)?,
            context: country_context(meta, country, site.views)?,
        });
    }

    for view in site.views {
        let id = PageId::City(&view.city.slug);
        pages.push(Page {
            kind: TemplateKind::City,
            file_path: file_path(id),
            url: meta.urls.page(id)?,
            context: city_context(meta, view)?,
        });
    }

    Ok(pages)
}

/// The result of a fallible page-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// An error during templating.
    Render(RenderError),

    /// An error building page URLs.
    UrlParse(ParseError),

    /// An error writing the output files.
    Io(io::Error),
}

impl From<io::Error> for Error {
    /// Converts an [`io::Error`] into an [`Error`]. This allows us to use the
    /// `?` operator for fallible I/O operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<RenderError> for Error {
    /// Converts a [`RenderError`] into an [`Error`]. This allows us to use
    /// the `?` operator for fallible template operations.
    fn from(err: RenderError) -> Error {
        Error::Render(err)
    }
}

impl From<ParseError> for Error {
    /// Converts a [`ParseError`] into an [`Error`]. This allows us to use the
    /// `?` operator for URL joins.
    fn from(err: ParseError) -> Error {
        Error::UrlParse(err)
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Render(err) => err.fmt(f),
            Error::UrlParse(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Render(err) => Some(err),
            Error::UrlParse(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::join::{countries, join_matrix};
    use crate::model::*;
    use crate::render::MissingPolicy;
    use crate::url::LocaleUrls;
    use std::collections::BTreeMap;

    fn city(slug: &str, country: &str) -> CityRecord {
        CityRecord {
            slug: slug.to_owned(),
            name: slug.to_owned(),
            country_slug: country.to_owned(),
            country_name: country.to_owned(),
            currency: None,
        }
    }

    #[test]
    fn test_locale_pages_order_and_paths() -> Result<()> {
        let cities = vec![city("paris", "france"), city("dakar", "senegal"), city("lyon", "france")];
        let categories = vec![CategoryRecord {
            slug: "loyer".to_owned(),
            name: "Loyer".to_owned(),
            unit: None,
        }];
        let views = join_matrix(&cities, &categories, &[]);
        let countries = countries(&cities);
        let site = Site {
            views: &views,
            categories: &categories,
            countries: &countries,
        };

        let site_url = Url::parse("https://example.org/")?;
        let locales = vec![
            ("fr".to_owned(), LocaleUrls::new(&site_url, None)?),
            ("en".to_owned(), LocaleUrls::new(&site_url, Some("en"))?),
        ];
        let labels = labels(&BTreeMap::new());
        let meta = PageMeta {
            title: "",
            description: "",
            year: 2024,
            generated_on: "2024-01-01",
            lang: "en",
            labels: &labels,
            site_url: &site_url,
            urls: &locales[1].1,
            locales: &locales,
        };

        let pages = locale_pages(&site, &meta, Some("en"))?;
        assert_eq!(site.page_count(), pages.len());
        let paths: Vec<PathBuf> = pages.iter().map(|p| p.file_path.clone()).collect();
        assert_eq!(
            vec![
                PathBuf::from("en/index.html"),
                PathBuf::from("en/categories/loyer.html"),
                PathBuf::from("en/countries/france.html"),
                PathBuf::from("en/countries/senegal.html"),
                PathBuf::from("en/cities/paris.html"),
                PathBuf::from("en/cities/dakar.html"),
                PathBuf::from("en/cities/lyon.html"),
            ],
            paths
        );
        assert_eq!("https://example.org/en/", pages[0].url.as_str());
        assert_eq!("https://example.org/en/cities/lyon.html", pages[6].url.as_str());
        Ok(())
    }

    #[test]
    fn test_write_page_creates_directories() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut renderer = Renderer::new(MissingPolicy::Permissive, "?")?;
        renderer.add_template(TemplateKind::City, "{{.name}}: {{.value}}")?;
        let mut writer = Writer::new(&renderer, dir.path());
        let page = Page {
            kind: TemplateKind::City,
            file_path: PathBuf::from("cities/paris.html"),
            url: Url::parse("https://example.org/cities/paris.html")?,
            context: Context::new().with("name", "Paris").with("value", ContextValue::Missing),
        };

        let urls = writer.write_pages(&[page])?;
        assert_eq!(vec![Url::parse("https://example.org/cities/paris.html")?], urls);
        assert_eq!(
            "Paris: ?",
            std::fs::read_to_string(dir.path().join("cities/paris.html"))?
        );
        Ok(())
    }
}
