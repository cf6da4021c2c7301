//! Built-in alias tables mapping place names onto ISO 3166-1 alpha-3 codes.

/// Cities checked before countries so "Paris, Texas" still maps somewhere sensible.
const CITY_ALIASES: &[(&str, &str)] = &[
    ("tokyo", "JPN"),
    ("osaka", "JPN"),
    ("kyoto", "JPN"),
    ("new york", "USA"),
    ("los angeles", "USA"),
    ("chicago", "USA"),
    ("london", "GBR"),
    ("manchester", "GBR"),
    ("paris", "FRA"),
    ("marseille", "FRA"),
    ("berlin", "DEU"),
    ("munich", "DEU"),
    ("moscow", "RUS"),
    ("москва", "RUS"),
    ("beijing", "CHN"),
    ("shanghai", "CHN"),
    ("delhi", "IND"),
    ("mumbai", "IND"),
    ("sydney", "AUS"),
    ("melbourne", "AUS"),
    ("toronto", "CAN"),
    ("vancouver", "CAN"),
    ("sao paulo", "BRA"),
    ("rio", "BRA"),
];

const COUNTRY_ALIASES: &[(&str, &str)] = &[
    ("russia", "RUS"),
    ("россия", "RUS"),
    ("usa", "USA"),
    ("united states", "USA"),
    ("america", "USA"),
    ("brazil", "BRA"),
    ("бразилия", "BRA"),
    ("brasil", "BRA"),
    ("china", "CHN"),
    ("китай", "CHN"),
    ("india", "IND"),
    ("индия", "IND"),
    ("japan", "JPN"),
    ("япония", "JPN"),
    ("germany", "DEU"),
    ("united kingdom", "GBR"),
    ("britain", "GBR"),
    ("uk", "GBR"),
    ("france", "FRA"),
    ("canada", "CAN"),
    ("australia", "AUS"),
    ("mexico", "MEX"),
    ("italy", "ITA"),
    ("spain", "ESP"),
    ("south korea", "KOR"),
    ("korea", "KOR"),
];

/// Display names for the codes above, used by the offline estimator.
const COUNTRY_NAMES: &[(&str, &str)] = &[
    ("BRA", "Brazil"),
    ("CHN", "China"),
    ("IND", "India"),
    ("USA", "USA"),
    ("RUS", "Russia"),
    ("JPN", "Japan"),
    ("DEU", "Germany"),
    ("GBR", "UK"),
    ("FRA", "France"),
    ("ITA", "Italy"),
    ("ESP", "Spain"),
    ("CAN", "Canada"),
    ("AUS", "Australia"),
    ("MEX", "Mexico"),
    ("KOR", "South Korea"),
];

/// Case-insensitive substring lookup of a location's country code.
///
/// City aliases win over country aliases. Returns `None` when nothing matches.
pub fn lookup_country_code(location: &str) -> Option<&'static str> {
    let location = location.to_lowercase();
    CITY_ALIASES
        .iter()
        .chain(COUNTRY_ALIASES)
        .find(|(alias, _)| location.contains(alias))
        .map(|(_, code)| *code)
}

pub fn country_name(code: &str) -> Option<&'static str> {
    COUNTRY_NAMES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
}
