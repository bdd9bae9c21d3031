//! Indonesian time zone for a resolved province.

use super::normalize::{normalize_province, strip_entry, NameContext};
use chrono_tz::Tz;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IndonesianZone {
    /// Waktu Indonesia Barat, UTC+7
    Wib,
    /// Waktu Indonesia Tengah, UTC+8
    Wita,
    /// Waktu Indonesia Timur, UTC+9
    Wit,
}

impl IndonesianZone {
    pub fn tz(self) -> Tz {
        match self {
            Self::Wib => chrono_tz::Asia::Jakarta,
            Self::Wita => chrono_tz::Asia::Makassar,
            Self::Wit => chrono_tz::Asia::Jayapura,
        }
    }

    pub fn abbreviation(self) -> &'static str {
        match self {
            Self::Wib => "WIB",
            Self::Wita => "WITA",
            Self::Wit => "WIT",
        }
    }
}

impl fmt::Display for IndonesianZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.abbreviation(), self.tz().name())
    }
}

// West and Central Kalimantan are WIB; the rest of Kalimantan is WITA.
const WITA_PREFIXES: &[&str] = &[
    "bali",
    "nusa tenggara",
    "kalimantan selatan",
    "kalimantan timur",
    "kalimantan utara",
    "sulawesi",
    "gorontalo",
];
const WIT_PREFIXES: &[&str] = &["maluku", "papua"];

/// Zone for a province name (canonical or raw). Unknown names fall back to WIB,
/// which covers the majority of the population.
pub fn zone_for_province(province: &str) -> IndonesianZone {
    let name = normalize_province(&strip_entry(province, NameContext::Province));
    if WIT_PREFIXES.iter().any(|p| name.starts_with(p)) {
        IndonesianZone::Wit
    } else if WITA_PREFIXES.iter().any(|p| name.starts_with(p)) {
        IndonesianZone::Wita
    } else {
        IndonesianZone::Wib
    }
}
