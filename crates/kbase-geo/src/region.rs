//! Client address to region resolution.
//!
//! Region strings follow the ip2region layout `country|region|province|city|isp`
//! where `0` marks an unknown component.

use std::{
    fs,
    net::Ipv4Addr,
    panic::{self, AssertUnwindSafe},
    path::Path,
};

use kbase_types::{
    geo::{IpAddress, UNKNOWN_LOCATION},
    Result,
};
use tracing::error;

use crate::geo_error;

const REGION_FIELDS: usize = 5;

pub trait RegionSearcher: Send + Sync {
    fn search(&self, ip: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
struct RegionRange {
    start: u32,
    end: u32,
    region: String,
}

/// In-memory searcher over the ip2region source table.
///
/// Each line reads `start_ip|end_ip|country|region|province|city|isp`; blank
/// lines and lines starting with `#` are skipped.
#[derive(Debug, Clone, Default)]
pub struct RangeTableSearcher {
    ranges: Vec<RegionRange>,
}

impl RangeTableSearcher {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            geo_error(format!(
                "unable to read region table {}: {err}",
                path_ref.display()
            ))
        })?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let mut ranges = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.splitn(3, '|');
            let (Some(start), Some(end), Some(region)) = (fields.next(), fields.next(), fields.next())
            else {
                return Err(geo_error(format!("line {}: expected start|end|region", index + 1)));
            };
            let start = parse_ipv4(start).ok_or_else(|| {
                geo_error(format!("line {}: invalid start address '{start}'", index + 1))
            })?;
            let end = parse_ipv4(end).ok_or_else(|| {
                geo_error(format!("line {}: invalid end address '{end}'", index + 1))
            })?;
            if end < start {
                return Err(geo_error(format!("line {}: range end before start", index + 1)));
            }
            ranges.push(RegionRange {
                start,
                end,
                region: region.to_string(),
            });
        }
        ranges.sort_by_key(|r| r.start);
        Ok(Self { ranges })
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl RegionSearcher for RangeTableSearcher {
    fn search(&self, ip: &str) -> Result<String> {
        let addr = parse_ipv4(ip).ok_or_else(|| geo_error(format!("invalid ipv4 address '{ip}'")))?;
        let idx = self.ranges.partition_point(|r| r.start <= addr);
        idx.checked_sub(1)
            .map(|i| &self.ranges[i])
            .filter(|r| addr <= r.end)
            .map(|r| r.region.clone())
            .ok_or_else(|| geo_error(format!("no region covers {ip}")))
    }
}

fn parse_ipv4(text: &str) -> Option<u32> {
    text.trim().parse::<Ipv4Addr>().ok().map(u32::from)
}

/// Resolves addresses to locations, degrading to unknown on any failure.
pub struct IpLocator {
    searcher: Box<dyn RegionSearcher>,
}

impl IpLocator {
    pub fn new(searcher: impl RegionSearcher + 'static) -> Self {
        Self {
            searcher: Box::new(searcher),
        }
    }

    pub fn lookup(&self, ip: &str) -> IpAddress {
        let searched = panic::catch_unwind(AssertUnwindSafe(|| self.searcher.search(ip)));
        let region = match searched {
            Ok(Ok(region)) => region,
            Ok(Err(err)) => {
                error!("search ip failed for {ip}: {err}");
                return IpAddress::unknown(ip);
            }
            Err(_) => {
                error!("recovered from region searcher panic for {ip}");
                return IpAddress::unknown(ip);
            }
        };

        let fields: Vec<&str> = region.split('|').collect();
        if fields.len() != REGION_FIELDS {
            error!("invalid region '{region}' for {ip}");
            return IpAddress::unknown(ip);
        }

        IpAddress {
            ip: ip.to_string(),
            country: known_or_unknown(fields[0]),
            province: known_or_unknown(fields[2]),
            city: known_or_unknown(fields[3]),
        }
    }
}

fn known_or_unknown(field: &str) -> String {
    if field == "0" {
        UNKNOWN_LOCATION.to_string()
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbase_types::KbaseError;

    const TABLE: &str = "\
# sample table
1.0.0.0|1.0.0.255|澳大利亚|0|0|0|0
36.0.0.0|36.0.0.255|中国|0|香港|香港|电讯盈科

8.8.8.0|8.8.8.255|美国|0|加利福尼亚|0|谷歌
bad-line-kept-out|x
";

    fn table() -> RangeTableSearcher {
        RangeTableSearcher::parse(&TABLE.replace("bad-line-kept-out|x\n", "")).expect("parse table")
    }

    #[test]
    fn parses_table_and_searches_ranges() {
        let searcher = table();
        assert_eq!(searcher.len(), 3);
        assert_eq!(searcher.search("36.0.0.17").expect("hit"), "中国|0|香港|香港|电讯盈科");
        assert_eq!(searcher.search("1.0.0.255").expect("hit"), "澳大利亚|0|0|0|0");
        assert!(searcher.search("2.0.0.1").is_err());
        assert!(searcher.search("0.0.0.1").is_err());
        assert!(searcher.search("not-an-ip").is_err());
    }

    #[test]
    fn malformed_table_lines_are_rejected() {
        assert!(matches!(RangeTableSearcher::parse(TABLE), Err(KbaseError::Geo(_))));
        assert!(RangeTableSearcher::parse("1.0.0.9|1.0.0.1|x|0|0|0|0").is_err());
    }

    #[test]
    fn loads_table_from_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("ip.merge.txt");
        fs::write(&path, "8.8.8.0|8.8.8.255|美国|0|0|0|谷歌\n").expect("write table");
        let searcher = RangeTableSearcher::from_file(&path).expect("load");
        assert_eq!(searcher.len(), 1);
        assert!(RangeTableSearcher::from_file(dir.path().join("missing.txt")).is_err());
    }

    #[test]
    fn lookup_maps_zero_fields_to_unknown() {
        let locator = IpLocator::new(table());
        let addr = locator.lookup("8.8.8.8");
        assert_eq!(addr.country, "美国");
        assert_eq!(addr.province, "加利福尼亚");
        assert_eq!(addr.city, UNKNOWN_LOCATION);
        assert_eq!(addr.geo_key(), "美国|加利福尼亚|未知");

        let hk = locator.lookup("36.0.0.1");
        assert_eq!((hk.country.as_str(), hk.city.as_str()), ("中国", "香港"));
    }

    #[test]
    fn lookup_failure_degrades_to_unknown() {
        let locator = IpLocator::new(table());
        assert_eq!(locator.lookup("203.0.113.9"), IpAddress::unknown("203.0.113.9"));
    }

    struct Fixed(&'static str);

    impl RegionSearcher for Fixed {
        fn search(&self, _ip: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct Exploding;

    impl RegionSearcher for Exploding {
        fn search(&self, _ip: &str) -> Result<String> {
            panic!("corrupt index")
        }
    }

    #[test]
    fn malformed_region_degrades_to_unknown() {
        let locator = IpLocator::new(Fixed("中国|香港"));
        assert_eq!(locator.lookup("1.1.1.1"), IpAddress::unknown("1.1.1.1"));
    }

    #[test]
    fn searcher_panic_degrades_to_unknown() {
        let locator = IpLocator::new(Exploding);
        assert_eq!(locator.lookup("1.1.1.1"), IpAddress::unknown("1.1.1.1"));
    }
}
