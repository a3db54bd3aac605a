//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: reading the source tables
//! ([`crate::source`]), joining them ([`crate::join`]), rendering every page
//! of every locale ([`crate::write`]), writing the sitemap and robots
//! documents ([`crate::sitemap`]), and copying static files.

use crate::config::Config;
use crate::context::{labels, PageMeta};
use crate::join::{countries, Dataset};
use crate::model;
use crate::render::{Error as RenderError, Renderer, TemplateKind};
use crate::sitemap::{self, ROBOTS_FILE, SITEMAP_FILE};
use crate::source::{read_table, Error as SourceError};
use crate::url::{directory_url, LocaleUrls, PAGE_DIRECTORIES};
use crate::util::{copy_dir, is_file_name, rmdir};
use crate::write::{locale_pages, Error as WriteError, Site, Writer};
use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::{ParseError, Url};

/// The date a build is stamped with. Captured once per run so every page
/// carries the same date.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Clock {
    pub today: NaiveDate,
}

impl Clock {
    /// A clock reading the local date.
    pub fn now() -> Clock {
        Clock {
            today: chrono::Local::now().date_naive(),
        }
    }

    pub fn fixed(today: NaiveDate) -> Clock {
        Clock { today }
    }
}

/// What a build produced.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// The absolute URL of every generated page except the primary index
    /// (which is the site root), in generation order.
    pub pages: Vec<Url>,

    /// The number of files written, pages included.
    pub files_written: usize,

    /// The static files copied into the output tree.
    pub static_files_copied: usize,
}

/// Reads the source tables named in `sources`. Every table is read before
/// anything is written.
pub fn load_dataset(config: &Config) -> Result<Dataset> {
    let sources = &config.sources;
    let cities = model::cities(&read_table(&sources.cities)?)?;
    let prices = read_table(&sources.prices)?;
    Ok(match &sources.categories {
        None => Dataset::Flat {
            cities,
            prices: model::flat_prices(&prices)?,
        },
        Some(categories) => Dataset::Matrix {
            cities,
            categories: model::categories(&read_table(categories)?)?,
            prices: model::matrix_prices(&prices)?,
        },
    })
}

/// Builds the site from a [`Config`]. This calls into [`load_dataset`],
/// [`Dataset::join`], and [`locale_pages`] which do the heavy-lifting, then
/// writes the sitemap and robots documents and copies static files. Any
/// error aborts the build; files already written stay on disk.
pub fn build_site(config: &Config, clock: &Clock) -> Result<BuildReport> {
    let dataset = load_dataset(config)?;
    let renderer = Renderer::from_theme(&config.templates, config.missing_policy, &config.placeholder)?;
    if !dataset.categories().is_empty() && !renderer.has_template(TemplateKind::Category) {
        return Err(RenderError::MissingTemplate(TemplateKind::Category).into());
    }

    let views = dataset.join();
    let countries = countries(dataset.cities());
    info!(
        cities = views.len(),
        categories = dataset.categories().len(),
        countries = countries.len(),
        "loaded dataset"
    );
    let site = Site {
        views: &views,
        categories: dataset.categories(),
        countries: &countries,
    };

    // Secondary locale codes name directories that get removed below.
    if let Some(locale) = config.locales.iter().find(|locale| !is_file_name(&locale.code)) {
        return Err(Error::InvalidLocale(locale.code.clone()));
    }

    // Clear previously generated entity pages so removed cities don't
    // linger. The output root itself is never deleted.
    let output = config.output_directory.as_path();
    let mut stale: Vec<PathBuf> = PAGE_DIRECTORIES.iter().map(|dir| output.join(dir)).collect();
    stale.extend(config.locales.iter().skip(1).map(|locale| output.join(&locale.code)));
    for dir in &stale {
        rmdir(dir).map_err(|err| Error::Clean {
            path: dir.clone(),
            err,
        })?;
    }

    let locales = config
        .locales
        .iter()
        .enumerate()
        .map(|(i, locale)| {
            let prefix = match i {
                0 => None,
                _ => Some(locale.code.as_str()),
            };
            Ok((locale.code.clone(), LocaleUrls::new(&config.site_url, prefix)?))
        })
        .collect::<Result<Vec<_>>>()?;
    // The primary locale lives at the site root.
    let root = directory_url(&config.site_url);
    let generated_on = clock.today.format("%Y-%m-%d").to_string();

    let mut writer = Writer::new(&renderer, output);
    let mut report = BuildReport::default();
    for (i, locale) in config.locales.iter().enumerate() {
        let labels = labels(&locale.labels);
        let meta = PageMeta {
            title: &config.title,
            description: &config.description,
            year: clock.today.year(),
            generated_on: &generated_on,
            lang: &locale.code,
            labels: &labels,
            site_url: &config.site_url,
            urls: &locales[i].1,
            locales: &locales,
        };
        let prefix = match i {
            0 => None,
            _ => Some(locale.code.as_str()),
        };
        let pages = locale_pages(&site, &meta, prefix)?;
        let urls = writer.write_pages(&pages)?;
        info!(locale = %locale.code, pages = urls.len(), "wrote pages");
        report.files_written += urls.len();
        report.pages.extend(urls.into_iter().filter(|url| *url != root));
    }

    let sitemap_url = sitemap::sitemap_url(&root)?;
    let sitemap = sitemap::render_sitemap(&renderer, &root, &report.pages)?;
    writer.write_document(Path::new(SITEMAP_FILE), &sitemap)?;
    let robots = sitemap::render_robots(&renderer, &sitemap_url)?;
    writer.write_document(Path::new(ROBOTS_FILE), &robots)?;
    report.files_written += 2;

    report.static_files_copied = copy_static(config)?;
    info!(
        pages = report.pages.len() + 1,
        static_files = report.static_files_copied,
        output = %output.display(),
        "site built"
    );
    Ok(report)
}

// Copies the theme's static directory and each configured static file (if
// present) into the output root.
fn copy_static(config: &Config) -> Result<usize> {
    let output = &config.output_directory;
    let mut copied = 0;
    if config.static_directory.is_dir() {
        copied += copy_dir(&config.static_directory, output)?;
    }
    for file in &config.static_files {
        match file.file_name() {
            Some(name) if file.is_file() => {
                std::fs::copy(file, output.join(name))?;
                copied += 1;
            }
            _ => debug!(path = %file.display(), "static file not found; skipping"),
        }
    }
    Ok(copied)
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during reading sources,
/// templating, writing, cleaning output directories, and other I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned for missing or malformed source tables.
    Source(SourceError),

    /// Returned for template loading and rendering errors.
    Render(RenderError),

    /// Returned for errors writing pages to disk.
    Write(WriteError),

    /// Returned when a page URL can't be built from the site URL.
    UrlParse(ParseError),

    /// Returned when a locale code can't be used as a directory name.
    InvalidLocale(String),

    /// Returned for I/O problems while cleaning output directories.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Source(err) => err.fmt(f),
            Error::Render(err) => err.fmt(f),
            Error::Write(err) => err.fmt(f),
            Error::UrlParse(err) => write!(f, "Building page URL: {}", err),
            Error::InvalidLocale(code) => write!(f, "Invalid locale code {:?}", code),
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Source(err) => Some(err),
            Error::Render(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::UrlParse(err) => Some(err),
            Error::InvalidLocale(_) => None,
            Error::Clean { path: _, err } => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<SourceError> for Error {
    /// Converts [`SourceError`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: SourceError) -> Error {
        Error::Source(err)
    }
}

impl From<RenderError> for Error {
    /// Converts [`RenderError`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: RenderError) -> Error {
        Error::Render(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}

impl From<ParseError> for Error {
    /// Converts [`ParseError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ParseError) -> Error {
        Error::UrlParse(err)
    }
}
