//! Joins cities with their prices and derives per-city and per-country
//! values. The two price schemas are the two variants of [`Dataset`]:
//!
//! * [`Dataset::Flat`]: one price row per city with named price points, from
//!   which the estimated monthly [`Budget`] is derived.
//! * [`Dataset::Matrix`]: one price per (city, category) pair, yielding a
//!   city x category matrix.
//!
//! Both joins are left joins: every city produces exactly one
//! [`JoinedCityView`], whether or not any price row matches it.

use crate::model::*;
use std::collections::HashMap;
use tracing::warn;

/// The loaded source tables. The variant is decided by whether a categories
/// table was supplied.
#[derive(Debug)]
pub enum Dataset {
    Flat {
        cities: Vec<CityRecord>,
        prices: Vec<FlatPriceRow>,
    },
    Matrix {
        cities: Vec<CityRecord>,
        categories: Vec<CategoryRecord>,
        prices: Vec<MatrixPriceRow>,
    },
}

impl Dataset {
    pub fn cities(&self) -> &[CityRecord] {
        match self {
            Dataset::Flat { cities, .. } => cities,
            Dataset::Matrix { cities, .. } => cities,
        }
    }

    /// The categories, in table order. Always empty for [`Dataset::Flat`].
    pub fn categories(&self) -> &[CategoryRecord] {
        match self {
            Dataset::Flat { .. } => &[],
            Dataset::Matrix { categories, .. } => categories,
        }
    }

    /// Joins cities with prices. See [`join_flat`] and [`join_matrix`].
    pub fn join(&self) -> Vec<JoinedCityView<'_>> {
        match self {
            Dataset::Flat { cities, prices } => join_flat(cities, prices),
            Dataset::Matrix {
                cities,
                categories,
                prices,
            } => join_matrix(cities, categories, prices),
        }
    }
}

/// A city joined with its prices.
#[derive(Clone, Debug, PartialEq)]
pub struct JoinedCityView<'a> {
    pub city: &'a CityRecord,
    pub prices: CityPrices<'a>,
}

/// The price side of a [`JoinedCityView`].
#[derive(Clone, Debug, PartialEq)]
pub enum CityPrices<'a> {
    /// The city's price points and the budget derived from them. `budget`
    /// is `None` when the city has no price row.
    Flat {
        prices: FlatPrices,
        budget: Option<Budget>,
    },

    /// One cell per category, in category-table order.
    Matrix(Vec<Cell<'a>>),
}

/// One cell of the city x category matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell<'a> {
    pub category: &'a CategoryRecord,
    pub value: Price,
}

impl<'a> JoinedCityView<'a> {
    /// The derived budget, if this view comes from the flat schema and the
    /// city has a price row.
    pub fn budget(&self) -> Option<Budget> {
        match &self.prices {
            CityPrices::Flat { budget, .. } => *budget,
            CityPrices::Matrix(_) => None,
        }
    }

    /// The value for the category at `index` in the category table. Missing
    /// for flat views.
    pub fn cell(&self, index: usize) -> Price {
        match &self.prices {
            CityPrices::Matrix(cells) => cells.get(index).map(|c| c.value).unwrap_or_default(),
            CityPrices::Flat { .. } => Price::Missing,
        }
    }
}

/// The estimated monthly budget for a city.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Budget {
    /// The rounded estimate.
    pub amount: i64,

    /// How many of the [`BUDGET_INPUTS`] were present. Missing inputs count
    /// as zero, so an incomplete budget is a lower bound.
    pub known_inputs: usize,
}

impl Budget {
    pub fn is_complete(&self) -> bool {
        self.known_inputs == BUDGET_INPUTS.len()
    }
}

/// The inputs of [`budget_estimate`] and their weights.
pub const BUDGET_INPUTS: [(PricePoint, f64); 5] = [
    (PricePoint::RentCenter, 1.0),
    (PricePoint::Utilities, 1.0),
    (PricePoint::Internet, 1.0),
    (PricePoint::Transport, 1.0),
    (PricePoint::MealCost, 10.0),
];

/// Estimates a monthly budget: one city-center rent, utilities, internet,
/// transport, and ten meals. Missing inputs count as zero. The sum is
/// rounded half away from zero.
pub fn budget_estimate(prices: &FlatPrices) -> Budget {
    let mut total = 0.0;
    let mut known_inputs = 0;
    for (point, weight) in BUDGET_INPUTS.iter().copied() {
        let price = prices.get(point);
        if !price.is_missing() {
            known_inputs += 1;
        }
        total += weight * price.or_zero();
    }
    Budget {
        amount: total.round() as i64,
        known_inputs,
    }
}

/// Left-joins `cities` with flat `prices` on the city slug. Output order
/// follows `cities`. Cities without a price row get all-missing prices and no
/// budget. If a slug has several price rows, the last one wins.
pub fn join_flat<'a>(cities: &'a [CityRecord], prices: &[FlatPriceRow]) -> Vec<JoinedCityView<'a>> {
    let mut by_slug: HashMap<&str, &FlatPrices> = HashMap::new();
    for row in prices {
        if by_slug.insert(row.city_slug.as_str(), &row.prices).is_some() {
            warn!(city = %row.city_slug, "duplicate price row; keeping the last one");
        }
    }

    cities
        .iter()
        .map(|city| {
            let row = by_slug.get(city.slug.as_str()).copied();
            let budget = row.map(budget_estimate);
            let prices = row.cloned().unwrap_or_default();
            JoinedCityView {
                city,
                prices: CityPrices::Flat { prices, budget },
            }
        })
        .collect()
}

/// Left-joins `cities` x `categories` with matrix `prices` on
/// `(city_slug, category_slug)`. The outer order follows `cities`, the inner
/// order follows `categories`. Absent pairs yield missing cells.
pub fn join_matrix<'a>(
    cities: &'a [CityRecord],
    categories: &'a [CategoryRecord],
    prices: &[MatrixPriceRow],
) -> Vec<JoinedCityView<'a>> {
    let mut by_key: HashMap<(&str, &str), Price> = HashMap::new();
    for row in prices {
        if by_key
            .insert((row.city_slug.as_str(), row.category_slug.as_str()), row.value)
            .is_some()
        {
            warn!(
                city = %row.city_slug,
                category = %row.category_slug,
                "duplicate price row; keeping the last one"
            );
        }
    }

    cities
        .iter()
        .map(|city| JoinedCityView {
            city,
            prices: CityPrices::Matrix(
                categories
                    .iter()
                    .map(|category| Cell {
                        category,
                        value: by_key
                            .get(&(city.slug.as_str(), category.slug.as_str()))
                            .copied()
                            .unwrap_or_default(),
                    })
                    .collect(),
            ),
        })
        .collect()
}

/// A group of cities sharing a `country_slug`.
#[derive(Clone, Debug, PartialEq)]
pub struct Country<'a> {
    pub slug: &'a str,

    /// The `country_name` of the first city seen with this slug.
    pub name: &'a str,

    /// Indices into the city slice passed to [`countries`], in city order.
    pub cities: Vec<usize>,
}

/// Groups `cities` by `country_slug`. Every city belongs to exactly one
/// group. Groups are sorted by case-insensitive name, then by slug.
pub fn countries(cities: &[CityRecord]) -> Vec<Country<'_>> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut countries: Vec<Country> = Vec::new();
    for (i, city) in cities.iter().enumerate() {
        match positions.get(city.country_slug.as_str()) {
            Some(&position) => countries[position].cities.push(i),
            None => {
                positions.insert(city.country_slug.as_str(), countries.len());
                countries.push(Country {
                    slug: &city.country_slug,
                    name: &city.country_name,
                    cities: vec![i],
                });
            }
        }
    }

    countries.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.slug.cmp(b.slug))
    });
    countries
}

#[cfg(test)]
mod test {
    use super::*;

    fn city(slug: &str, country_slug: &str, country_name: &str) -> CityRecord {
        CityRecord {
            slug: slug.to_owned(),
            name: slug.to_uppercase(),
            country_slug: country_slug.to_owned(),
            country_name: country_name.to_owned(),
            currency: None,
        }
    }

    fn category(slug: &str) -> CategoryRecord {
        CategoryRecord {
            slug: slug.to_owned(),
            name: slug.to_owned(),
            unit: None,
        }
    }

    #[test]
    fn test_budget_estimate_example() {
        let prices = FlatPrices::from_pairs(vec![
            (PricePoint::RentCenter, 500.0),
            (PricePoint::Utilities, 100.0),
            (PricePoint::Internet, 30.0),
            (PricePoint::Transport, 50.0),
            (PricePoint::MealCost, 8.0),
        ]);
        let budget = budget_estimate(&prices);
        assert_eq!(760, budget.amount);
        assert!(budget.is_complete());
    }

    #[test]
    fn test_budget_ignores_non_budget_points() {
        let prices = FlatPrices::from_pairs(vec![
            (PricePoint::RentCenter, 500.0),
            (PricePoint::Coffee, 3.0),
            (PricePoint::RentOutside, 400.0),
        ]);
        assert_eq!(500, budget_estimate(&prices).amount);
    }

    #[test]
    fn test_budget_missing_inputs_equal_zero_inputs() {
        let values = [500.0, 100.0, 30.0, 50.0, 8.0];

        // every subset of the five inputs
        for mask in 0..32u32 {
            let mut missing = FlatPrices::default();
            let mut zeroed = FlatPrices::default();
            for (bit, ((point, _), value)) in BUDGET_INPUTS.iter().zip(values.iter()).enumerate() {
                if mask & (1 << bit) == 0 {
                    missing.set(*point, Price::Known(*value));
                    zeroed.set(*point, Price::Known(*value));
                } else {
                    zeroed.set(*point, Price::Known(0.0));
                }
            }
            let from_missing = budget_estimate(&missing);
            let from_zeroed = budget_estimate(&zeroed);
            assert_eq!(from_zeroed.amount, from_missing.amount, "mask {:05b}", mask);
            assert_eq!(mask == 0, from_missing.is_complete());
            assert_eq!(5 - mask.count_ones() as usize, from_missing.known_inputs);
            assert!(from_zeroed.is_complete());
        }
    }

    #[test]
    fn test_budget_is_monotonic_in_each_input() {
        let base = FlatPrices::from_pairs(
            BUDGET_INPUTS.iter().map(|(point, _)| (*point, 10.0)),
        );
        let base_amount = budget_estimate(&base).amount;
        for (point, _) in BUDGET_INPUTS.iter() {
            for bump in &[0.0, 0.4, 1.0, 250.0] {
                let mut bumped = base.clone();
                bumped.set(*point, Price::Known(10.0 + bump));
                assert!(budget_estimate(&bumped).amount >= base_amount);
            }
        }
    }

    #[test]
    fn test_budget_rounds() {
        let prices = FlatPrices::from_pairs(vec![
            (PricePoint::RentCenter, 500.25),
            (PricePoint::MealCost, 1.03),
        ]);
        // 500.25 + 10.3 = 510.55
        assert_eq!(511, budget_estimate(&prices).amount);
    }

    #[test]
    fn test_join_flat_keeps_cities_without_prices() {
        let cities = vec![city("paris", "fr", "France"), city("lyon", "fr", "France")];
        let prices = vec![FlatPriceRow {
            city_slug: "lyon".to_owned(),
            prices: FlatPrices::from_pairs(vec![(PricePoint::RentCenter, 700.0)]),
        }];
        let views = join_flat(&cities, &prices);

        assert_eq!(2, views.len());
        assert_eq!("paris", views[0].city.slug);
        match &views[0].prices {
            CityPrices::Flat { prices, budget } => {
                assert!(PricePoint::ALL.iter().all(|p| prices.get(*p).is_missing()));
                assert_eq!(None, *budget);
            }
            other => panic!("wanted flat prices; found {:?}", other),
        }
        assert_eq!(Some(700), views[1].budget().map(|b| b.amount));
    }

    #[test]
    fn test_join_flat_row_without_budget_inputs_is_zero() {
        let cities = vec![city("paris", "fr", "France")];
        let prices = vec![FlatPriceRow {
            city_slug: "paris".to_owned(),
            prices: FlatPrices::from_pairs(vec![(PricePoint::Coffee, 3.0)]),
        }];
        let budget = join_flat(&cities, &prices)[0].budget().unwrap();
        assert_eq!(0, budget.amount);
        assert_eq!(0, budget.known_inputs);
        assert!(!budget.is_complete());
    }

    #[test]
    fn test_join_flat_last_duplicate_wins() {
        let cities = vec![city("paris", "fr", "France")];
        let prices = vec![
            FlatPriceRow {
                city_slug: "paris".to_owned(),
                prices: FlatPrices::from_pairs(vec![(PricePoint::RentCenter, 1.0)]),
            },
            FlatPriceRow {
                city_slug: "paris".to_owned(),
                prices: FlatPrices::from_pairs(vec![(PricePoint::RentCenter, 2.0)]),
            },
        ];
        assert_eq!(Some(2), join_flat(&cities, &prices)[0].budget().map(|b| b.amount));
    }

    #[test]
    fn test_join_matrix_orders_and_fills_missing() {
        let cities = vec![city("paris", "fr", "France"), city("dakar", "sn", "Sénégal")];
        let categories = vec![category("loyer"), category("cafe")];
        let prices = vec![
            MatrixPriceRow {
                city_slug: "paris".to_owned(),
                category_slug: "cafe".to_owned(),
                value: Price::Known(2.5),
            },
            MatrixPriceRow {
                city_slug: "nowhere".to_owned(),
                category_slug: "cafe".to_owned(),
                value: Price::Known(9.0),
            },
        ];
        let views = join_matrix(&cities, &categories, &prices);

        assert_eq!(vec!["paris", "dakar"], views.iter().map(|v| v.city.slug.as_str()).collect::<Vec<_>>());
        match &views[0].prices {
            CityPrices::Matrix(cells) => {
                assert_eq!(vec!["loyer", "cafe"], cells.iter().map(|c| c.category.slug.as_str()).collect::<Vec<_>>());
                assert_eq!(vec![Price::Missing, Price::Known(2.5)], cells.iter().map(|c| c.value).collect::<Vec<_>>());
            }
            other => panic!("wanted matrix prices; found {:?}", other),
        }
        assert_eq!(Price::Missing, views[1].cell(0));
        assert_eq!(Price::Missing, views[1].cell(1));
        assert_eq!(None, views[1].budget());
    }

    #[test]
    fn test_countries_partition_cities() {
        let cities = vec![
            city("paris", "france", "France"),
            city("abidjan", "cote-divoire", "côte d'Ivoire"),
            city("lyon", "france", "France"),
            city("berlin", "allemagne", "Allemagne"),
            city("dakar", "senegal", "Sénégal"),
        ];
        let countries = countries(&cities);

        assert_eq!(
            vec!["allemagne", "cote-divoire", "france", "senegal"],
            countries.iter().map(|c| c.slug).collect::<Vec<_>>()
        );

        let mut seen: Vec<usize> = countries.iter().flat_map(|c| c.cities.iter().copied()).collect();
        seen.sort_unstable();
        assert_eq!((0..cities.len()).collect::<Vec<_>>(), seen);

        for country in &countries {
            for &i in &country.cities {
                assert_eq!(country.slug, cities[i].country_slug);
            }
        }
        assert_eq!(vec![0, 2], countries[2].cities);
    }
}
