//! Applies [`Context`]s to `gtmpl` templates. The [`Renderer`] owns one
//! parsed template per [`TemplateKind`] and decides how values are escaped
//! and how [`ContextValue::Missing`] renders (see [`MissingPolicy`]). It
//! produces strings; writing them is [`crate::write`]'s job.

use crate::context::{Context, ContextValue};
use gtmpl::Template;
use gtmpl_value::Value;
use serde::Deserialize;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// The templates a site is rendered with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateKind {
    Index,
    Category,
    Country,
    City,
    Sitemap,
    Robots,
}

/// How text values are escaped before they reach a template.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Escape {
    Html,
    Xml,
    None,
}

impl TemplateKind {
    pub fn name(self) -> &'static str {
        match self {
            TemplateKind::Index => "index",
            TemplateKind::Category => "category",
            TemplateKind::Country => "country",
            TemplateKind::City => "city",
            TemplateKind::Sitemap => "sitemap",
            TemplateKind::Robots => "robots",
        }
    }

    pub fn escape(self) -> Escape {
        match self {
            TemplateKind::Sitemap => Escape::Xml,
            TemplateKind::Robots => Escape::None,
            _ => Escape::Html,
        }
    }

    /// The template used when a theme doesn't provide one. Only the sitemap
    /// and robots documents have one.
    fn builtin(self) -> Option<&'static str> {
        match self {
            TemplateKind::Sitemap => Some(SITEMAP_TEMPLATE),
            TemplateKind::Robots => Some(ROBOTS_TEMPLATE),
            _ => None,
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

const SITEMAP_TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{{range .urls}}
  <url><loc>{{.}}</loc><changefreq>weekly</changefreq></url>{{end}}
</urlset>
"#;

const ROBOTS_TEMPLATE: &str = "User-agent: *
Allow: /

Sitemap: {{.sitemap_url}}
";

/// What to do when a template receives a [`ContextValue::Missing`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPolicy {
    /// Render the placeholder text.
    Permissive,

    /// Fail with [`Error::TemplateRender`] if the context holds any missing
    /// value, including ones the template never reads.
    Strict,
}

impl Default for MissingPolicy {
    fn default() -> Self {
        MissingPolicy::Permissive
    }
}

/// The template source files for each kind. The files for a kind are
/// concatenated before parsing, so later files can use `{{define}}` blocks
/// from earlier ones.
pub type TemplateFiles = BTreeMap<TemplateKind, Vec<PathBuf>>;

/// Renders [`Context`]s into documents.
pub struct Renderer {
    templates: HashMap<TemplateKind, Template>,
    policy: MissingPolicy,
    placeholder: String,
}

impl Renderer {
    /// Creates a renderer with only the built-in templates.
    pub fn new(policy: MissingPolicy, placeholder: &str) -> Result<Renderer> {
        let mut renderer = Renderer {
            templates: HashMap::new(),
            policy,
            placeholder: placeholder.to_owned(),
        };
        for kind in [TemplateKind::Sitemap, TemplateKind::Robots].iter().copied() {
            if let Some(source) = kind.builtin() {
                renderer.add_template(kind, source)?;
            }
        }
        Ok(renderer)
    }

    /// Creates a renderer from theme template files. Kinds without files
    /// fall back to their built-in template, if any.
    pub fn from_theme(files: &TemplateFiles, policy: MissingPolicy, placeholder: &str) -> Result<Renderer> {
        let mut renderer = Renderer::new(policy, placeholder)?;
        for (kind, paths) in files {
            if !paths.is_empty() {
                renderer.add_template(*kind, &load_template_files(paths.iter())?)?;
            }
        }
        Ok(renderer)
    }

    /// Parses `source` as the template for `kind`, replacing any previous
    /// one.
    pub fn add_template(&mut self, kind: TemplateKind, source: &str) -> Result<()> {
        let mut template = Template::default();
        template
            .parse(source)
            .map_err(|err| Error::ParseTemplate {
                template: kind,
                detail: err.to_string(),
            })?;
        self.templates.insert(kind, template);
        Ok(())
    }

    pub fn has_template(&self, kind: TemplateKind) -> bool {
        self.templates.contains_key(&kind)
    }

    /// Renders `context` with the template for `kind`.
    pub fn render(&self, kind: TemplateKind, context: &Context) -> Result<String> {
        let template = self
            .templates
            .get(&kind)
            .ok_or(Error::MissingTemplate(kind))?;

        let value = self.map_to_value(kind, context, "")?;
        let render_error = |detail: String| Error::TemplateRender {
            template: kind,
            detail,
        };
        let mut out: Vec<u8> = Vec::new();
        template
            .execute(
                &mut out,
                &gtmpl::Context::from(value).map_err(|err| render_error(err.to_string()))?,
            )
            .map_err(|err| render_error(err.to_string()))?;
        String::from_utf8(out).map_err(|err| render_error(err.to_string()))
    }

    fn map_to_value(&self, kind: TemplateKind, context: &Context, path: &str) -> Result<Value> {
        let mut m: HashMap<String, Value> = HashMap::new();
        for (name, value) in context.iter() {
            let path = match path.is_empty() {
                true => name.clone(),
                false => format!("{}.{}", path, name),
            };
            let value = self.to_value(kind, value, &path)?;
            m.insert(name.clone(), value);
        }
        Ok(Value::Object(m))
    }

    // `path` names the value for strict-mode errors, e.g. `rows[2].value`.
    fn to_value(&self, kind: TemplateKind, value: &ContextValue, path: &str) -> Result<Value> {
        Ok(match value {
            ContextValue::Text(s) => Value::String(escape(s, kind.escape()).into_owned()),
            ContextValue::Integer(n) => Value::from(*n),
            ContextValue::Bool(b) => Value::Bool(*b),
            ContextValue::List(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.to_value(kind, item, &format!("{}[{}]", path, i)))
                    .collect::<Result<Vec<_>>>()?,
            ),
            ContextValue::Map(context) => self.map_to_value(kind, context, path)?,
            ContextValue::Missing => match self.policy {
                MissingPolicy::Permissive => {
                    Value::String(escape(&self.placeholder, kind.escape()).into_owned())
                }
                MissingPolicy::Strict => {
                    return Err(Error::TemplateRender {
                        template: kind,
                        detail: format!("missing value for `{}`", path),
                    })
                }
            },
        })
    }
}

/// Escapes `s` for the given output. HTML and XML share the same five
/// entities.
pub fn escape(s: &str, mode: Escape) -> Cow<str> {
    if mode == Escape::None || !s.contains(|c: char| matches!(c, '&' | '<' | '>' | '"' | '\'')) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

// Loads the template file contents and concatenates them.
fn load_template_files<P: AsRef<Path>>(template_files: impl Iterator<Item = P>) -> Result<String> {
    let mut contents = String::new();
    for template_file in template_files {
        use std::io::Read;
        let template_file = template_file.as_ref();
        File::open(&template_file)
            .and_then(|mut file| file.read_to_string(&mut contents))
            .map_err(|err| Error::OpenTemplateFile {
                path: template_file.to_owned(),
                err,
            })?;
        contents.push(' ');
    }
    Ok(contents)
}

/// The result of a fallible rendering operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading or applying a template.
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O problems while opening template files.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned when a template doesn't parse.
    ParseTemplate { template: TemplateKind, detail: String },

    /// Returned when a page needs a template the theme doesn't provide.
    MissingTemplate(TemplateKind),

    /// Returned when executing a template fails, or when a strict renderer
    /// meets a missing value.
    TemplateRender { template: TemplateKind, detail: String },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate { template, detail } => {
                write!(f, "Parsing {} template: {}", template, detail)
            }
            Error::MissingTemplate(template) => {
                write!(f, "The theme has no {} template", template)
            }
            Error::TemplateRender { template, detail } => {
                write!(f, "Rendering {} template: {}", template, detail)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::OpenTemplateFile { path: _, err } => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn renderer(policy: MissingPolicy) -> Renderer {
        let mut renderer = Renderer::new(policy, "n/a").unwrap();
        renderer
            .add_template(
                TemplateKind::City,
                "<h1>{{.city.name}}</h1>{{range .rows}}<td>{{.value}}</td>{{end}}",
            )
            .unwrap();
        renderer
    }

    fn city(value: ContextValue) -> Context {
        Context::new()
            .with("city", Context::new().with("name", "Saint-Denis <Réunion>"))
            .with("rows", vec![Context::new().with("value", value)])
    }

    #[test]
    fn test_render_escapes_html() -> Result<()> {
        let out = renderer(MissingPolicy::Permissive)
            .render(TemplateKind::City, &city(ContextValue::from("1 & 2")))?;
        assert_eq!(
            "<h1>Saint-Denis &lt;Réunion&gt;</h1><td>1 &amp; 2</td>",
            out
        );
        Ok(())
    }

    #[test]
    fn test_permissive_renders_placeholder() -> Result<()> {
        let out = renderer(MissingPolicy::Permissive)
            .render(TemplateKind::City, &city(ContextValue::Missing))?;
        assert_eq!("<h1>Saint-Denis &lt;Réunion&gt;</h1><td>n/a</td>", out);
        assert!(!out.contains("None"));
        assert!(!out.contains("NaN"));
        Ok(())
    }

    #[test]
    fn test_strict_rejects_missing() {
        match renderer(MissingPolicy::Strict).render(TemplateKind::City, &city(ContextValue::Missing)) {
            Err(Error::TemplateRender { template, detail }) => {
                assert_eq!(TemplateKind::City, template);
                assert!(detail.contains("rows[0].value"), "{}", detail);
            }
            other => panic!("wanted TemplateRender; found {:?}", other),
        }
    }

    #[test]
    fn test_strict_checks_values_the_template_ignores() {
        let context = city(ContextValue::from("12")).with("currency", ContextValue::Missing);
        assert!(renderer(MissingPolicy::Permissive).render(TemplateKind::City, &context).is_ok());
        match renderer(MissingPolicy::Strict).render(TemplateKind::City, &context) {
            Err(Error::TemplateRender { detail, .. }) => {
                assert!(detail.contains("`currency`"), "{}", detail)
            }
            other => panic!("wanted TemplateRender; found {:?}", other),
        }
    }

    #[test]
    fn test_missing_template() {
        let result = renderer(MissingPolicy::Permissive).render(TemplateKind::Country, &Context::new());
        assert!(matches!(result, Err(Error::MissingTemplate(TemplateKind::Country))));
    }

    #[test]
    fn test_builtin_robots() -> Result<()> {
        let out = Renderer::new(MissingPolicy::Strict, "")?.render(
            TemplateKind::Robots,
            &Context::new().with("sitemap_url", "https://example.org/sitemap.xml?a&b"),
        )?;
        assert_eq!(
            "User-agent: *\nAllow: /\n\nSitemap: https://example.org/sitemap.xml?a&b\n",
            out
        );
        Ok(())
    }

    #[test]
    fn test_escape() {
        assert_eq!("a &amp; b &lt;c&gt; &quot;d&quot; &#39;e&#39;", escape(r#"a & b <c> "d" 'e'"#, Escape::Html));
        assert_eq!("a & b", escape("a & b", Escape::None));
        assert!(matches!(escape("plain", Escape::Xml), Cow::Borrowed(_)));
    }
}
