//! Typed records converted from [`Table`]s: [`CityRecord`],
//! [`CategoryRecord`], and the two price schemas ([`FlatPriceRow`] and
//! [`MatrixPriceRow`]).

use crate::source::{Record, Result, Table};
use crate::util::is_file_name;
use std::collections::HashSet;

/// A city, keyed by `slug`.
#[derive(Clone, Debug, PartialEq)]
pub struct CityRecord {
    pub slug: String,
    pub name: String,
    pub country_slug: String,
    pub country_name: String,
    pub currency: Option<String>,
}

/// A price category (e.g., "rent for a one-bedroom apartment"), keyed by
/// `slug`. Only used by the city x category schema.
#[derive(Clone, Debug, PartialEq)]
pub struct CategoryRecord {
    pub slug: String,
    pub name: String,
    pub unit: Option<String>,
}

/// A numeric price cell. Absence is a value of its own rather than zero so
/// that pages can show a placeholder instead of a misleading `0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Price {
    Known(f64),
    Missing,
}

impl Price {
    pub fn value(self) -> Option<f64> {
        match self {
            Price::Known(n) => Some(n),
            Price::Missing => None,
        }
    }

    /// The price, or zero if it's missing.
    pub fn or_zero(self) -> f64 {
        self.value().unwrap_or(0.0)
    }

    pub fn is_missing(self) -> bool {
        self == Price::Missing
    }
}

impl Default for Price {
    fn default() -> Self {
        Price::Missing
    }
}

impl From<Option<f64>> for Price {
    fn from(value: Option<f64>) -> Price {
        match value {
            Some(n) => Price::Known(n),
            None => Price::Missing,
        }
    }
}

/// The named price points of the flat (one row per city) price schema. Each
/// variant corresponds to an optional column in the prices table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PricePoint {
    RentCenter,
    RentOutside,
    Utilities,
    Internet,
    Transport,
    MealCost,
    Coffee,
    Fitness,
}

impl PricePoint {
    /// Every price point, in display order.
    pub const ALL: [PricePoint; 8] = [
        PricePoint::RentCenter,
        PricePoint::RentOutside,
        PricePoint::Utilities,
        PricePoint::Internet,
        PricePoint::Transport,
        PricePoint::MealCost,
        PricePoint::Coffee,
        PricePoint::Fitness,
    ];

    /// The column name in the prices table. Also used as the label key.
    pub fn column(self) -> &'static str {
        match self {
            PricePoint::RentCenter => "rent_center",
            PricePoint::RentOutside => "rent_outside",
            PricePoint::Utilities => "utilities",
            PricePoint::Internet => "internet",
            PricePoint::Transport => "transport",
            PricePoint::MealCost => "meal_cost",
            PricePoint::Coffee => "coffee",
            PricePoint::Fitness => "fitness",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// The price points for one city in the flat schema.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlatPrices {
    values: [Price; 8],
}

impl FlatPrices {
    pub fn get(&self, point: PricePoint) -> Price {
        self.values[point.index()]
    }

    pub fn set(&mut self, point: PricePoint, price: Price) {
        self.values[point.index()] = price;
    }

    /// Builds a [`FlatPrices`] from `(point, value)` pairs; unlisted points
    /// are missing.
    pub fn from_pairs<I: IntoIterator<Item = (PricePoint, f64)>>(pairs: I) -> FlatPrices {
        let mut prices = FlatPrices::default();
        for (point, value) in pairs {
            prices.set(point, Price::Known(value));
        }
        prices
    }
}

/// A row of the flat price schema: one set of price points per city slug.
#[derive(Clone, Debug, PartialEq)]
pub struct FlatPriceRow {
    pub city_slug: String,
    pub prices: FlatPrices,
}

/// A row of the matrix price schema: one value per (city, category) pair.
#[derive(Clone, Debug, PartialEq)]
pub struct MatrixPriceRow {
    pub city_slug: String,
    pub category_slug: String,
    pub value: Price,
}

const CITY_SLUG: &[&str] = &["city_slug", "slug"];
const CITY_NAME: &[&str] = &["city_name", "name"];

/// Converts the cities table into [`CityRecord`]s. `country_slug` falls back
/// to the slugified `country_name` when the column is absent or empty.
/// Duplicate city slugs are rejected.
pub fn cities(table: &Table) -> Result<Vec<CityRecord>> {
    let slug_column = table.require(CITY_SLUG)?;
    let name_column = table.require(CITY_NAME)?;
    let country_name_column = table.require(&["country_name"])?;

    let mut seen = HashSet::new();
    let mut cities = Vec::with_capacity(table.rows.len());
    for record in &table.rows {
        let slug = slug_value(table, record, slug_column)?;
        if !seen.insert(slug.clone()) {
            return Err(table.malformed(record, format!("duplicate city slug `{}`", slug)));
        }
        let country_name = table.required_value(record, country_name_column)?;
        let country_slug = match record.get("country_slug") {
            Some(country_slug) => country_slug.to_owned(),
            None => slug::slugify(country_name),
        };
        cities.push(CityRecord {
            slug,
            name: table.required_value(record, name_column)?.to_owned(),
            country_slug,
            country_name: country_name.to_owned(),
            currency: record.get("currency").map(str::to_owned),
        });
    }
    Ok(cities)
}

/// Converts the categories table into [`CategoryRecord`]s.
pub fn categories(table: &Table) -> Result<Vec<CategoryRecord>> {
    let slug_column = table.require(&["slug", "category_slug"])?;
    let name_column = table.require(&["name", "category_name"])?;

    let mut seen = HashSet::new();
    let mut categories = Vec::with_capacity(table.rows.len());
    for record in &table.rows {
        let slug = slug_value(table, record, slug_column)?;
        if !seen.insert(slug.clone()) {
            return Err(table.malformed(record, format!("duplicate category slug `{}`", slug)));
        }
        categories.push(CategoryRecord {
            slug,
            name: table.required_value(record, name_column)?.to_owned(),
            unit: record.get("unit").map(str::to_owned),
        });
    }
    Ok(categories)
}

/// Converts a flat prices table (one row per city). Price-point columns
/// absent from the header are missing for every row.
pub fn flat_prices(table: &Table) -> Result<Vec<FlatPriceRow>> {
    let slug_column = table.require(CITY_SLUG)?;

    let mut rows = Vec::with_capacity(table.rows.len());
    for record in &table.rows {
        let mut prices = FlatPrices::default();
        for point in PricePoint::ALL.iter().copied() {
            prices.set(point, table.number(record, point.column())?.into());
        }
        rows.push(FlatPriceRow {
            city_slug: slug_value(table, record, slug_column)?,
            prices,
        });
    }
    Ok(rows)
}

/// Converts a matrix prices table (one row per city and category).
pub fn matrix_prices(table: &Table) -> Result<Vec<MatrixPriceRow>> {
    let city_column = table.require(&["city_slug"])?;
    let category_column = table.require(&["category_slug"])?;
    let value_column = table.require(&["value"])?;

    let mut rows = Vec::with_capacity(table.rows.len());
    for record in &table.rows {
        rows.push(MatrixPriceRow {
            city_slug: slug_value(table, record, city_column)?,
            category_slug: slug_value(table, record, category_column)?,
            value: table.number(record, value_column)?.into(),
        });
    }
    Ok(rows)
}

// Slugs become file names, so anything that could escape the kind directory
// is rejected.
fn slug_value(table: &Table, record: &Record, column: &str) -> Result<String> {
    let slug = table.required_value(record, column)?;
    if !is_file_name(slug) {
        return Err(table.malformed(record, format!("invalid slug {:?}", slug)));
    }
    Ok(slug.to_owned())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::source::{read_table, Error};
    use std::fs;

    fn table(contents: &str) -> Table {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv");
        fs::write(&path, contents).unwrap();
        read_table(&path).unwrap()
    }

    #[test]
    fn test_cities_accepts_column_aliases() -> Result<()> {
        let cities = cities(&table(
            "city_slug,city_name,country_slug,country_name,currency\n\
             paris,Paris,france,France,EUR\n\
             dakar,Dakar,,Sénégal,\n",
        ))?;
        assert_eq!(
            vec![
                CityRecord {
                    slug: "paris".to_owned(),
                    name: "Paris".to_owned(),
                    country_slug: "france".to_owned(),
                    country_name: "France".to_owned(),
                    currency: Some("EUR".to_owned()),
                },
                CityRecord {
                    slug: "dakar".to_owned(),
                    name: "Dakar".to_owned(),
                    country_slug: "senegal".to_owned(),
                    country_name: "Sénégal".to_owned(),
                    currency: None,
                },
            ],
            cities
        );
        Ok(())
    }

    #[test]
    fn test_duplicate_city_slug_is_malformed() {
        let result = cities(&table(
            "slug,name,country_name\nparis,Paris,France\nparis,Paris bis,France\n",
        ));
        assert!(matches!(result, Err(Error::MalformedRecord { line: 3, .. })));
    }

    #[test]
    fn test_path_like_slug_is_malformed() {
        let result = cities(&table("slug,name,country_name\n../etc,Nope,France\n"));
        assert!(matches!(result, Err(Error::MalformedRecord { .. })));
    }

    #[test]
    fn test_flat_prices_missing_columns_are_missing() -> Result<()> {
        let rows = flat_prices(&table("slug,rent_center,meal_cost\nparis,1200,\n"))?;
        assert_eq!(1, rows.len());
        let prices = &rows[0].prices;
        assert_eq!(Price::Known(1200.0), prices.get(PricePoint::RentCenter));
        assert_eq!(Price::Missing, prices.get(PricePoint::MealCost));
        assert_eq!(Price::Missing, prices.get(PricePoint::Internet));
        Ok(())
    }

    #[test]
    fn test_matrix_prices() -> Result<()> {
        let rows = matrix_prices(&table(
            "city_slug,category_slug,value\nparis,loyer,1200.5\nparis,cafe,\n",
        ))?;
        assert_eq!(Price::Known(1200.5), rows[0].value);
        assert_eq!("cafe", rows[1].category_slug);
        assert!(rows[1].value.is_missing());
        Ok(())
    }
}
