//! OSM `highway` tag ranking.
//!
//! Road classes are ordered from least to most significant; the rank feeds
//! the escape-path scoring (a motorway escape is worth more to block than a
//! residential street).

/// Rank of a single base highway class, 0–6.
///
/// `_link` suffixes (ramps, slip roads) rank like their base class.  Classes
/// outside the drivable major-road set rank 0.
pub fn highway_rank(class: &str) -> u8 {
    let base = class.strip_suffix("_link").unwrap_or(class);
    match base {
        "motorway" => 6,
        "trunk" => 5,
        "primary" => 4,
        "secondary" => 3,
        "tertiary" => 2,
        "residential" => 1,
        _ => 0, // "unclassified" and anything unexpected
    }
}

/// Rank of a raw GraphML `highway` attribute value.
///
/// Simplified OSM graphs store either a plain class (`"primary"`) or a
/// stringified list (`"['primary', 'secondary_link']"`) when the edge merges
/// ways of different classes; a list ranks as the max of its members.
pub fn parse_highway_attr(raw: &str) -> u8 {
    let trimmed = raw.trim();
    if let Some(inner) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        inner
            .split(',')
            .map(|part| highway_rank(part.trim().trim_matches('\'').trim_matches('"')))
            .max()
            .unwrap_or(0)
    } else {
        highway_rank(trimmed)
    }
}
