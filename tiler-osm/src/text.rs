//! Text fixups applied to imported names and addresses.

/// Street-type abbreviations and their expansions.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("st", "Street"),
    ("str", "Street"),
    ("ave", "Avenue"),
    ("av", "Avenue"),
    ("rd", "Road"),
    ("dr", "Drive"),
    ("blvd", "Boulevard"),
    ("ln", "Lane"),
    ("ct", "Court"),
    ("hwy", "Highway"),
    ("pl", "Place"),
    ("cir", "Circle"),
    ("pkwy", "Parkway"),
    ("trl", "Trail"),
    ("ter", "Terrace"),
    ("sq", "Square"),
    ("mt", "Mount"),
    ("ft", "Fort"),
];

const COMPASS: &[(&str, &str)] = &[
    ("n", "North"),
    ("s", "South"),
    ("e", "East"),
    ("w", "West"),
    ("ne", "Northeast"),
    ("nw", "Northwest"),
    ("se", "Southeast"),
    ("sw", "Southwest"),
];

/// Tokens that introduce a unit designator inside a full address.
const UNIT_MARKERS: &[&str] = &[
    "unit",
    "apt",
    "apartment",
    "ste",
    "suite",
    "lot",
    "spc",
    "space",
    "rm",
    "room",
];

/// Normalise a name: capitalise words, expand abbreviations and compass
/// directions.
///
/// A leading `St` followed by more words reads as `Saint`.
///
/// # Examples
/// ```
/// use tiler_osm::normalize_name;
///
/// assert_eq!(normalize_name("main st"), "Main Street");
/// assert_eq!(normalize_name("N BROADWAY"), "North Broadway");
/// assert_eq!(normalize_name("St Vrain Rd."), "Saint Vrain Road");
/// ```
#[must_use]
pub fn normalize_name(value: &str) -> String {
    let words: Vec<&str> = value.split_whitespace().collect();
    let last = words.len().saturating_sub(1);
    words
        .iter()
        .enumerate()
        .map(|(index, word)| {
            let bare = word.trim_end_matches(['.', ',']);
            let key = bare.to_ascii_lowercase();
            if index == 0 && index != last && key == "st" {
                return "Saint".to_owned();
            }
            lookup(COMPASS, &key)
                .or_else(|| lookup(ABBREVIATIONS, &key))
                .map_or_else(|| capitalize(bare), str::to_owned)
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn lookup(table: &[(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(abbrev, _)| *abbrev == key)
        .map(|(_, full)| *full)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Parts recovered from an `addr:full` value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressParts {
    /// Leading house number, when present.
    pub housenumber: Option<String>,
    /// Normalised street name.
    pub street: String,
    /// Unit designator dropped from the street, when present.
    pub unit: Option<String>,
}

/// Split a one-line address into house number, street and unit.
///
/// Anything after the first comma (city, state, postcode) is ignored. A
/// leading number is only taken as the house number when more words follow
/// and it is not an ordinal such as `5th`.
///
/// # Examples
/// ```
/// use tiler_osm::split_full_address;
///
/// let parts = split_full_address("1234 N Main St Apt 5, Boulder CO");
/// assert_eq!(parts.housenumber.as_deref(), Some("1234"));
/// assert_eq!(parts.street, "North Main Street");
/// assert_eq!(parts.unit.as_deref(), Some("Apt 5"));
/// ```
#[must_use]
pub fn split_full_address(full: &str) -> AddressParts {
    let line = full.split(',').next().unwrap_or_default();
    let mut tokens: Vec<&str> = line.split_whitespace().collect();

    let housenumber = match tokens.first() {
        Some(first)
            if tokens.len() > 1
                && first.starts_with(|c: char| c.is_ascii_digit())
                && !is_ordinal(first) =>
        {
            let number = (*first).to_owned();
            tokens.remove(0);
            Some(number)
        }
        _ => None,
    };

    let unit_start = tokens.iter().position(|token| {
        token.starts_with('#')
            || UNIT_MARKERS.contains(&token.trim_end_matches('.').to_ascii_lowercase().as_str())
    });
    let unit = unit_start.map(|start| tokens.split_off(start).join(" "));

    AddressParts {
        housenumber,
        street: normalize_name(&tokens.join(" ")),
        unit: unit.filter(|unit| !unit.is_empty()),
    }
}

fn is_ordinal(token: &str) -> bool {
    let suffix = token.trim_start_matches(|c: char| c.is_ascii_digit());
    suffix.len() < token.len()
        && ["st", "nd", "rd", "th"].contains(&suffix.to_ascii_lowercase().as_str())
}
