//! Builds the named values each page template receives. A [`Context`] is an
//! ordered map of [`ContextValue`]s; optional data is always present as
//! [`ContextValue::Missing`] rather than as an absent key, so how a missing
//! value renders is decided in one place ([`crate::render`]). The budget is
//! the exception: it only exists for flat-schema cities.
//!
//! Every page context carries the same cross-cutting values (see
//! [`PageMeta`]) plus the page-specific ones set by [`index_context`],
//! [`category_context`], [`country_context`], and [`city_context`].

use crate::join::{CityPrices, Country, JoinedCityView};
use crate::model::{CategoryRecord, CityRecord, Price, PricePoint};
use crate::url::{LocaleUrls, PageId};
use std::collections::BTreeMap;
use url::{ParseError, Url};

/// A template value.
#[derive(Clone, Debug, PartialEq)]
pub enum ContextValue {
    Text(String),
    Integer(i64),
    Bool(bool),
    List(Vec<ContextValue>),
    Map(Context),

    /// A value the data doesn't have. Rendered as the configured
    /// placeholder, or rejected in strict mode.
    Missing,
}

/// An ordered map from names to [`ContextValue`]s.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Context(BTreeMap<String, ContextValue>);

impl Context {
    pub fn new() -> Context {
        Context::default()
    }

    /// Sets `name` to `value`, replacing any previous value.
    pub fn insert<K: Into<String>, V: Into<ContextValue>>(&mut self, name: K, value: V) {
        self.0.insert(name.into(), value.into());
    }

    /// Builder-style [`Context::insert`].
    pub fn with<K: Into<String>, V: Into<ContextValue>>(mut self, name: K, value: V) -> Context {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ContextValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ContextValue)> {
        self.0.iter()
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> ContextValue {
        ContextValue::Text(s.to_owned())
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> ContextValue {
        ContextValue::Text(s)
    }
}

impl From<&String> for ContextValue {
    fn from(s: &String) -> ContextValue {
        ContextValue::Text(s.clone())
    }
}

impl From<i64> for ContextValue {
    fn from(n: i64) -> ContextValue {
        ContextValue::Integer(n)
    }
}

impl From<bool> for ContextValue {
    fn from(b: bool) -> ContextValue {
        ContextValue::Bool(b)
    }
}

impl From<&Url> for ContextValue {
    fn from(url: &Url) -> ContextValue {
        ContextValue::Text(url.to_string())
    }
}

impl From<Url> for ContextValue {
    fn from(url: Url) -> ContextValue {
        ContextValue::from(&url)
    }
}

impl From<Context> for ContextValue {
    fn from(context: Context) -> ContextValue {
        ContextValue::Map(context)
    }
}

impl From<Vec<Context>> for ContextValue {
    fn from(items: Vec<Context>) -> ContextValue {
        ContextValue::List(items.into_iter().map(ContextValue::Map).collect())
    }
}

impl<T: Into<ContextValue>> From<Option<T>> for ContextValue {
    fn from(value: Option<T>) -> ContextValue {
        match value {
            Some(value) => value.into(),
            None => ContextValue::Missing,
        }
    }
}

impl From<Price> for ContextValue {
    /// Prices become display text; see [`format_price`].
    fn from(price: Price) -> ContextValue {
        price.value().map(format_price).into()
    }
}

/// Formats a price for display: whole numbers without decimals, anything
/// else with two.
pub fn format_price(value: f64) -> String {
    match value.fract() == 0.0 {
        true => format!("{:.0}", value),
        false => format!("{:.2}", value),
    }
}

/// Labels every template can rely on. Locales override them from the
/// project file.
pub const DEFAULT_LABELS: [(&str, &str); 18] = [
    ("home", "Home"),
    ("categories", "Categories"),
    ("countries", "Countries"),
    ("cities", "Cities"),
    ("city", "City"),
    ("country", "Country"),
    ("price", "Price"),
    ("unit", "Unit"),
    ("budget", "Estimated monthly budget"),
    ("budget_incomplete", "Some prices are missing; the estimate is a lower bound."),
    ("rent_center", "Rent, city center"),
    ("rent_outside", "Rent, outside center"),
    ("utilities", "Utilities"),
    ("internet", "Internet"),
    ("transport", "Transport pass"),
    ("meal_cost", "Inexpensive meal"),
    ("coffee", "Coffee"),
    ("fitness", "Fitness club"),
];

/// Returns [`DEFAULT_LABELS`] with `overrides` applied on top.
pub fn labels(overrides: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut labels: BTreeMap<String, String> = DEFAULT_LABELS
        .iter()
        .map(|(key, label)| (key.to_string(), label.to_string()))
        .collect();
    for (key, label) in overrides {
        labels.insert(key.clone(), label.clone());
    }
    labels
}

/// The values present on every page.
pub struct PageMeta<'a> {
    /// The site's title and description from the project file.
    pub title: &'a str,
    pub description: &'a str,

    /// The year and date of the run.
    pub year: i32,
    pub generated_on: &'a str,

    /// The locale code of the page (e.g., `fr`).
    pub lang: &'a str,

    /// The locale's labels, already merged with [`DEFAULT_LABELS`].
    pub labels: &'a BTreeMap<String, String>,

    /// The site root URL.
    pub site_url: &'a Url,

    /// The URL builder for the page's locale.
    pub urls: &'a LocaleUrls,

    /// The `(lang, url builder)` pair for every locale, including the page's
    /// own. Used for `hreflang` alternates.
    pub locales: &'a [(String, LocaleUrls)],
}

impl PageMeta<'_> {
    /// The cross-cutting context for `page`.
    fn context(&self, page: PageId) -> Result<Context, ParseError> {
        let mut alternates = Vec::with_capacity(self.locales.len());
        for (lang, urls) in self.locales {
            alternates.push(
                Context::new()
                    .with("lang", lang)
                    .with("url", urls.page(page)?),
            );
        }

        let mut labels = Context::new();
        for (key, label) in self.labels {
            labels.insert(key.clone(), label);
        }

        Ok(Context::new()
            .with("title", self.title)
            .with("description", self.description)
            .with("year", i64::from(self.year))
            .with("generated_on", self.generated_on)
            .with("lang", self.lang)
            .with("labels", labels)
            .with("site_url", self.site_url)
            .with("home_url", self.urls.root())
            .with("canonical_url", self.urls.page(page)?)
            .with("alternates", alternates))
    }
}

// Adds `budget` and `budget_complete` for flat-schema cities. A city without
// a price row has a missing budget.
fn insert_budget(context: &mut Context, view: &JoinedCityView) {
    if let CityPrices::Flat { budget, .. } = &view.prices {
        context.insert("budget", budget.map(|b| b.amount));
        context.insert("budget_complete", budget.map_or(false, |b| b.is_complete()));
    }
}

fn city_summary(urls: &LocaleUrls, view: &JoinedCityView) -> Result<Context, ParseError> {
    let city = view.city;
    let mut summary = Context::new()
        .with("slug", &city.slug)
        .with("name", &city.name)
        .with("url", urls.page(PageId::City(&city.slug))?)
        .with("currency", city.currency.as_ref())
        .with("country_slug", &city.country_slug)
        .with("country_name", &city.country_name)
        .with("country_url", urls.page(PageId::Country(&city.country_slug))?);
    insert_budget(&mut summary, view);
    Ok(summary)
}

fn category_summary(urls: &LocaleUrls, category: &CategoryRecord) -> Result<Context, ParseError> {
    Ok(Context::new()
        .with("slug", &category.slug)
        .with("name", &category.name)
        .with("unit", category.unit.as_ref())
        .with("url", urls.page(PageId::Category(&category.slug))?))
}

fn country_summary(urls: &LocaleUrls, country: &Country) -> Result<Context, ParseError> {
    Ok(Context::new()
        .with("slug", country.slug)
        .with("name", country.name)
        .with("url", urls.page(PageId::Country(country.slug))?)
        .with("city_count", country.cities.len() as i64))
}

/// The home page: `categories`, `countries`, and `cities` lists.
pub fn index_context(
    meta: &PageMeta,
    categories: &[CategoryRecord],
    countries: &[Country],
    views: &[JoinedCityView],
) -> Result<Context, ParseError> {
    let mut context = meta.context(PageId::Index)?;
    context.insert(
        "categories",
        categories
            .iter()
            .map(|category| category_summary(meta.urls, category))
            .collect::<Result<Vec<_>, _>>()?,
    );
    context.insert(
        "countries",
        countries
            .iter()
            .map(|country| country_summary(meta.urls, country))
            .collect::<Result<Vec<_>, _>>()?,
    );
    context.insert(
        "cities",
        views
            .iter()
            .map(|view| city_summary(meta.urls, view))
            .collect::<Result<Vec<_>, _>>()?,
    );
    Ok(context)
}

/// A category page: the `category` and one row per city with the city's
/// value for the category. `index` is the category's position in the
/// category table.
pub fn category_context(
    meta: &PageMeta,
    category: &CategoryRecord,
    index: usize,
    views: &[JoinedCityView],
) -> Result<Context, ParseError> {
    let mut context = meta.context(PageId::Category(&category.slug))?;
    context.insert("category", category_summary(meta.urls, category)?);

    let mut rows = Vec::with_capacity(views.len());
    for view in views {
        rows.push(
            city_summary(meta.urls, view)?
                .with("city_name", &view.city.name)
                .with("value", view.cell(index)),
        );
    }
    context.insert("rows", rows);
    Ok(context)
}

/// A country page: the `country` and its `cities`, in city-table order.
pub fn country_context(
    meta: &PageMeta,
    country: &Country,
    views: &[JoinedCityView],
) -> Result<Context, ParseError> {
    let mut context = meta.context(PageId::Country(country.slug))?;
    context.insert("country", country_summary(meta.urls, country)?);
    context.insert(
        "cities",
        country
            .cities
            .iter()
            .map(|&i| city_summary(meta.urls, &views[i]))
            .collect::<Result<Vec<_>, _>>()?,
    );
    Ok(context)
}

/// A city page: the `city`, its price `rows`, and the derived `budget`.
///
/// For the flat schema each row is a price point (`slug`, `name` from the
/// labels, `value`); for the matrix schema each row is a category (`slug`,
/// `name`, `unit`, `url`, `value`). `variant` is `flat` or `matrix`
/// accordingly. `budget` and `budget_complete` are only present for the flat
/// schema.
pub fn city_context(meta: &PageMeta, view: &JoinedCityView) -> Result<Context, ParseError> {
    let city: &CityRecord = view.city;
    let mut context = meta.context(PageId::City(&city.slug))?;
    context.insert("city", city_summary(meta.urls, view)?);

    let (variant, rows) = match &view.prices {
        CityPrices::Flat { prices, .. } => (
            "flat",
            PricePoint::ALL
                .iter()
                .map(|point| {
                    let key = point.column();
                    Context::new()
                        .with("slug", key)
                        .with("name", meta.labels.get(key).map(String::as_str).unwrap_or(key))
                        .with("value", prices.get(*point))
                })
                .collect::<Vec<_>>(),
        ),
        CityPrices::Matrix(cells) => {
            let mut rows = Vec::with_capacity(cells.len());
            for cell in cells {
                rows.push(category_summary(meta.urls, cell.category)?.with("value", cell.value));
            }
            ("matrix", rows)
        }
    };
    context.insert("variant", variant);
    context.insert("rows", rows);
    insert_budget(&mut context, view);
    Ok(context)
}
