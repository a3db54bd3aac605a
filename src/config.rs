//! Loads the project file (`combien.yaml`) and the theme file
//! (`theme.yaml`) into a [`Config`]. Paths in both files are relative to the
//! file that names them.

use crate::render::{MissingPolicy, TemplateFiles, TemplateKind};
use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the project file.
pub const PROJECT_FILE: &str = "combien.yaml";

#[derive(Deserialize)]
struct Placeholder(String);
impl Default for Placeholder {
    fn default() -> Self {
        Placeholder(String::from("N/A"))
    }
}

#[derive(Deserialize)]
struct Project {
    pub site_url: Url,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub data: DataFiles,

    #[serde(default = "default_theme")]
    pub theme: PathBuf,

    #[serde(default)]
    pub placeholder: Placeholder,

    #[serde(default)]
    pub missing_policy: MissingPolicy,

    #[serde(default = "default_locales")]
    pub locales: Vec<Locale>,

    #[serde(default)]
    pub static_files: Vec<PathBuf>,
}

fn default_theme() -> PathBuf {
    PathBuf::from("theme")
}

fn default_locales() -> Vec<Locale> {
    vec![Locale {
        code: String::from("fr"),
        labels: BTreeMap::new(),
    }]
}

#[derive(Deserialize)]
struct DataFiles {
    cities: PathBuf,
    prices: PathBuf,

    #[serde(default)]
    categories: Option<PathBuf>,
}

#[derive(Deserialize)]
struct Theme {
    index_template: Vec<PathBuf>,

    #[serde(default)]
    category_template: Vec<PathBuf>,

    country_template: Vec<PathBuf>,
    city_template: Vec<PathBuf>,

    #[serde(default)]
    sitemap_template: Vec<PathBuf>,

    #[serde(default)]
    robots_template: Vec<PathBuf>,
}

/// A site language. The first locale of a project is the primary one and is
/// written at the output root; the others are mirrored under `{code}/`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Locale {
    pub code: String,

    /// Label overrides for the locale's templates. See
    /// [`crate::context::DEFAULT_LABELS`].
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// The source tables.
#[derive(Clone, Debug)]
pub struct Sources {
    pub cities: PathBuf,
    pub prices: PathBuf,

    /// Present for the city x category schema, absent for the flat one.
    pub categories: Option<PathBuf>,
}

/// Everything a build needs. Constructed once and passed to
/// [`crate::build::build_site`]; nothing is read from global state, so a
/// process can build several configurations.
#[derive(Clone, Debug)]
pub struct Config {
    /// The public root URL of the site. Always ends in `/`.
    pub site_url: Url,
    pub title: String,
    pub description: String,
    pub sources: Sources,
    pub templates: TemplateFiles,

    /// Copied recursively into the output root.
    pub static_directory: PathBuf,

    /// Individual files copied into the output root when they exist.
    pub static_files: Vec<PathBuf>,

    pub output_directory: PathBuf,
    pub placeholder: String,
    pub missing_policy: MissingPolicy,
    pub locales: Vec<Locale>,
}

impl Config {
    /// Searches `dir` and its ancestors for a project file and loads it.
    pub fn from_directory(dir: &Path, output_directory: &Path) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            match Config::from_project_file(&path, output_directory) {
                Ok(config) => Ok(config),
                Err(e) => Err(anyhow!("Loading configuration: {:?}", e)),
            }
        } else {
            match dir.parent() {
                Some(dir) => Config::from_directory(dir, output_directory),
                None => Err(anyhow!(
                    "Could not find `{}` in any parent directory",
                    PROJECT_FILE
                )),
            }
        }
    }

    /// Loads the project file at `path` and the theme it names.
    pub fn from_project_file(path: &Path, output_directory: &Path) -> Result<Config> {
        use crate::util::{is_file_name, open};
        let project: Project = serde_yaml::from_reader(open(path, "project")?)?;
        let project_root = match path.parent() {
            None => {
                return Err(anyhow!(
                    "Can't get parent directory for provided project file path '{:?}'",
                    path
                ))
            }
            Some(project_root) => project_root,
        };

        if project.locales.is_empty() {
            return Err(anyhow!("The project must declare at least one locale"));
        }
        let mut codes = std::collections::HashSet::new();
        for locale in &project.locales {
            // Secondary locales become output directories.
            if !is_file_name(&locale.code) {
                return Err(anyhow!("Invalid locale code {:?}", locale.code));
            }
            if !codes.insert(&locale.code) {
                return Err(anyhow!("Duplicate locale code {:?}", locale.code));
            }
        }

        let theme_dir = project_root.join(&project.theme);
        let theme: Theme = serde_yaml::from_reader(open(&theme_dir.join("theme.yaml"), "theme")?)?;
        let resolve = |paths: Vec<PathBuf>| -> Vec<PathBuf> {
            paths.iter().map(|relpath| theme_dir.join(relpath)).collect()
        };
        let mut templates = TemplateFiles::new();
        templates.insert(TemplateKind::Index, resolve(theme.index_template));
        templates.insert(TemplateKind::Category, resolve(theme.category_template));
        templates.insert(TemplateKind::Country, resolve(theme.country_template));
        templates.insert(TemplateKind::City, resolve(theme.city_template));
        templates.insert(TemplateKind::Sitemap, resolve(theme.sitemap_template));
        templates.insert(TemplateKind::Robots, resolve(theme.robots_template));

        Ok(Config {
            site_url: crate::url::directory_url(&project.site_url),
            title: project.title,
            description: project.description,
            sources: Sources {
                cities: project_root.join(project.data.cities),
                prices: project_root.join(project.data.prices),
                categories: project.data.categories.map(|c| project_root.join(c)),
            },
            templates,
            static_directory: theme_dir.join("static"),
            static_files: project
                .static_files
                .iter()
                .map(|relpath| project_root.join(relpath))
                .collect(),
            output_directory: output_directory.to_owned(),
            placeholder: project.placeholder.0,
            missing_policy: project.missing_policy,
            locales: project.locales,
        })
    }
}
