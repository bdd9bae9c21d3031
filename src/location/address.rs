//! Picks province and city candidates out of a geocoder address record.

use super::types::{AddressRecord, CityType};
use serde::Serialize;

/// Fields that may name the province, most trustworthy first.
pub const PROVINCE_FIELDS: &[&str] = &["state", "state_district", "region", "province", "county"];

/// City fields in priority order, with the type each one implies.
/// `county` is almost always a kabupaten in Indonesian OSM data.
const CITY_FIELDS: &[(&str, Option<CityType>)] = &[
    ("county", Some(CityType::Regency)),
    ("city", Some(CityType::City)),
    ("town", None),
    ("municipality", None),
];

/// Candidate strings extracted from one address record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Candidates {
    pub province_candidates: Vec<String>,
    pub raw_city: Option<String>,
    pub city_type_hint: Option<CityType>,
}

impl Candidates {
    /// Query handed to the city resolver: the raw city, prefixed with the
    /// type hint when there is one.
    pub fn city_query(&self) -> Option<String> {
        let raw = self.raw_city.as_deref()?;
        Some(match self.city_type_hint {
            Some(hint) => format!("{} {}", hint.prefix(), raw),
            None => raw.to_string(),
        })
    }
}

pub fn select_candidates(record: &AddressRecord) -> Candidates {
    let province_candidates = PROVINCE_FIELDS
        .iter()
        .filter_map(|field| record.get(field))
        .map(str::to_string)
        .collect();

    let (raw_city, city_type_hint) = CITY_FIELDS
        .iter()
        .find_map(|(field, hint)| record.get(field).map(|v| (Some(v.to_string()), *hint)))
        .unwrap_or((None, None));

    Candidates {
        province_candidates,
        raw_city,
        city_type_hint,
    }
}
