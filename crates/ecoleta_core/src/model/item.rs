//! Item catalog model and item-id list parsing.

use serde::Serialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Identifier of one item category.
pub type ItemId = i64;

/// A category of collectible material, as stored in the `items` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    /// Stored image filename, relative to the item-image base URL.
    pub image: String,
}

/// Catalog entry with the image rewritten into a resolvable URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub title: String,
    pub image_url: String,
}

/// Rejected segment of a delimited item-id list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemIdParseError {
    pub segment: String,
}

impl Display for ItemIdParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid item id `{}`; expected a positive integer",
            self.segment
        )
    }
}

impl Error for ItemIdParseError {}

/// Parses a comma-separated item-id list (`"1, 2,3"`) into a set.
///
/// Blank segments are skipped and duplicates collapse, so `""` yields an
/// empty set. Any other segment must be a positive integer.
pub fn parse_item_ids(text: &str) -> Result<BTreeSet<ItemId>, ItemIdParseError> {
    let mut ids = BTreeSet::new();
    for segment in text.split(',') {
        let trimmed = segment.trim();
        if trimmed.is_empty() {
            continue;
        }
        match trimmed.parse::<ItemId>() {
            Ok(id) if id > 0 => {
                ids.insert(id);
            }
            _ => {
                return Err(ItemIdParseError {
                    segment: trimmed.to_string(),
                })
            }
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::parse_item_ids;

    #[test]
    fn parses_and_deduplicates() {
        let ids = parse_item_ids("3, 1,2,,3 ").unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn blank_text_is_empty_set() {
        assert!(parse_item_ids("  ").unwrap().is_empty());
        assert!(parse_item_ids("").unwrap().is_empty());
    }

    #[test]
    fn rejects_non_numeric_and_non_positive_segments() {
        assert_eq!(parse_item_ids("1,abc").unwrap_err().segment, "abc");
        assert_eq!(parse_item_ids("0").unwrap_err().segment, "0");
        assert_eq!(parse_item_ids("-4").unwrap_err().segment, "-4");
    }
}
