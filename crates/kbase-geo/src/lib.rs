//! Geographic visit distribution: per-country aggregation and IP region lookup.

pub mod region;

use std::collections::{BTreeMap, HashMap};

use kbase_types::{
    geo::{CountryCount, UNKNOWN_LOCATION},
    KbaseError, Result,
};

pub use region::{IpLocator, RangeTableSearcher, RegionSearcher};

/// Parses the stat API payload: a JSON object of `"country|province|city"` to visit count.
pub fn parse_geo_counts(json: &str) -> Result<HashMap<String, u64>> {
    serde_json::from_str(json).map_err(|err| geo_error(format!("invalid geo count payload: {err}")))
}

/// Folds `country|province|city` counts into per-country totals, busiest first.
///
/// A missing country segment is counted under [`UNKNOWN_LOCATION`]. Equal
/// totals are ordered by name.
pub fn aggregate_by_country<'a, I>(counts: I) -> Vec<CountryCount>
where
    I: IntoIterator<Item = (&'a String, &'a u64)>,
{
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for (key, count) in counts {
        let country = key.split('|').next().unwrap_or_default();
        let country = if country.is_empty() {
            UNKNOWN_LOCATION
        } else {
            country
        };
        *totals.entry(country).or_default() += count;
    }

    let mut list: Vec<CountryCount> = totals
        .into_iter()
        .map(|(name, count)| CountryCount {
            name: name.to_string(),
            count,
        })
        .collect();
    // Stable sort keeps the BTreeMap name order among equal counts.
    list.sort_by(|a, b| b.count.cmp(&a.count));
    list
}

pub fn geo_error(message: impl Into<String>) -> KbaseError {
    KbaseError::Geo(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, u64)]) -> HashMap<String, u64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn sums_provinces_and_cities_into_country() {
        let map = counts(&[
            ("中国|香港|香港", 12),
            ("中国|澳门|澳门", 8),
            ("美国|加利福尼亚|洛杉矶", 5),
            ("美国|纽约|纽约", 1),
            ("日本|东京|东京", 30),
        ]);
        let list = aggregate_by_country(&map);
        assert_eq!(
            list,
            vec![
                CountryCount { name: "日本".into(), count: 30 },
                CountryCount { name: "中国".into(), count: 20 },
                CountryCount { name: "美国".into(), count: 6 },
            ]
        );
    }

    #[test]
    fn empty_country_is_counted_as_unknown() {
        let map = counts(&[("|", 3), ("", 2), ("未知|未知|未知", 4), ("德国||", 1)]);
        let list = aggregate_by_country(&map);
        assert_eq!(list[0], CountryCount { name: UNKNOWN_LOCATION.into(), count: 9 });
        assert_eq!(list[1], CountryCount { name: "德国".into(), count: 1 });
    }

    #[test]
    fn ties_are_ordered_by_name() {
        let map = counts(&[("b", 2), ("a", 2), ("c", 5)]);
        let names: Vec<_> = aggregate_by_country(&map).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn empty_input_yields_empty_list() {
        assert!(aggregate_by_country(&HashMap::<String, u64>::new()).is_empty());
    }

    #[test]
    fn parses_stat_payload() {
        let map = parse_geo_counts(r#"{"中国|香港|香港": 3, "美国|纽约|纽约": 1}"#).expect("parse");
        assert_eq!(map.get("中国|香港|香港"), Some(&3));
        assert!(matches!(parse_geo_counts("[1, 2]"), Err(KbaseError::Geo(_))));
    }
}
