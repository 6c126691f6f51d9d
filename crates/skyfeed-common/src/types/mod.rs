//! Common types used across Skyfeed
//!
//! These are both the in-memory join model and the JSON wire schema accepted by
//! the ingestion API (`POST /data/add`). Empty string attributes are omitted on
//! the wire; numeric attributes are always present.

use serde::{Deserialize, Serialize};

// ============================================================================
// Reference Types
// ============================================================================

/// A drugstore location; the unit of price-list publication.
///
/// Identity is the source-assigned `code`, unique within one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Outlet {
    /// Source-assigned outlet code
    #[serde(rename = "id", skip_serializing_if = "String::is_empty")]
    pub code: String,

    /// Display name, never empty once normalized
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Fixed tag of the source that delivered this outlet
    #[serde(skip_serializing_if = "String::is_empty")]
    pub head: String,

    /// Postal address
    #[serde(skip_serializing_if = "String::is_empty")]
    pub addr: String,

    /// Optional state registration code
    #[serde(skip_serializing_if = "String::is_empty")]
    pub egrpou: String,

    /// Optional reference to the file this outlet was read from
    #[serde(skip_serializing_if = "String::is_empty")]
    pub file: String,
}

impl Outlet {
    /// Build an outlet, substituting the source tag when the name is blank.
    pub fn new(code: impl Into<String>, name: impl Into<String>, head: impl Into<String>) -> Self {
        let head = head.into();
        let name = name.into();
        let name = if name.trim().is_empty() {
            head.clone()
        } else {
            name
        };

        Self {
            code: code.into(),
            name,
            head,
            ..Self::default()
        }
    }

    pub fn with_addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    pub fn with_egrpou(mut self, egrpou: impl Into<String>) -> Self {
        self.egrpou = egrpou.into();
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }
}

/// A sellable product referenced by code across feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub code: String,
    pub name: String,
}

impl CatalogItem {
    /// Build an item whose display name folds in the manufacturer.
    pub fn new(code: impl Into<String>, name: &str, maker: &str) -> Self {
        Self {
            code: code.into(),
            name: compose_display_name(name, maker),
        }
    }
}

/// Concatenate an item name with its manufacturer.
///
/// The manufacturer is left out when it already appears, case-insensitively,
/// inside the name (this includes an empty manufacturer).
pub fn compose_display_name(name: &str, maker: &str) -> String {
    let name = name.trim();
    let maker = maker.trim();

    if name.to_lowercase().contains(&maker.to_lowercase()) {
        name.to_string()
    } else if name.is_empty() {
        maker.to_string()
    } else {
        format!("{} {}", name, maker)
    }
}

// ============================================================================
// Publication Types
// ============================================================================

/// One (item, quantity, price) tuple in an outlet's list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceLine {
    #[serde(rename = "id", skip_serializing_if = "String::is_empty")]
    pub code: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,

    pub quant: f64,

    pub price: f64,

    /// Where the item can be found, when the source knows it
    #[serde(skip_serializing_if = "String::is_empty")]
    pub addr: String,

    /// Product page of the item
    #[serde(skip_serializing_if = "String::is_empty")]
    pub link: String,
}

impl PriceLine {
    pub fn new(item: &CatalogItem, quant: f64, price: f64) -> Self {
        Self {
            code: item.code.clone(),
            name: item.name.clone(),
            quant,
            price,
            ..Self::default()
        }
    }

    /// Attach a product page, published as both `addr` and `link`.
    pub fn with_link(mut self, url: impl Into<String>) -> Self {
        self.link = url.into();
        self.addr = self.link.clone();
        self
    }
}

/// An outlet with its ordered price lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceList {
    pub meta: Outlet,
    pub data: Vec<PriceLine>,
}

impl PriceList {
    pub fn new(meta: Outlet) -> Self {
        Self {
            meta,
            data: Vec::new(),
        }
    }

    pub fn outlet_code(&self) -> &str {
        &self.meta.code
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_outlet_blank_name_takes_head() {
        let outlet = Outlet::new("7", "", "АВЕ");
        assert_eq!(outlet.name, "АВЕ");

        let outlet = Outlet::new("7", "   ", "STL");
        assert_eq!(outlet.name, "STL");
    }

    #[test]
    fn test_compose_display_name() {
        assert_eq!(compose_display_name("Aspirin", "AcmeCo"), "Aspirin AcmeCo");
        assert_eq!(compose_display_name("Aspirin ACMECO 500", "AcmeCo"), "Aspirin ACMECO 500");
        assert_eq!(compose_display_name("Аспирин Дарница", "дарница"), "Аспирин Дарница");
        assert_eq!(compose_display_name("Aspirin", ""), "Aspirin");
        assert_eq!(compose_display_name("", "AcmeCo"), "AcmeCo");
    }

    #[test]
    fn test_wire_schema_omits_empty_strings() {
        let mut list = PriceList::new(Outlet::new("101", "Central Pharmacy", "STL"));
        list.data.push(PriceLine {
            code: "C1".to_string(),
            name: "Aspirin AcmeCo".to_string(),
            quant: 12.5,
            price: 3.4,
            ..PriceLine::default()
        });

        let value = serde_json::to_value(&list).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "meta": {"id": "101", "name": "Central Pharmacy", "head": "STL"},
                "data": [{"id": "C1", "name": "Aspirin AcmeCo", "quant": 12.5, "price": 3.4}]
            })
        );
    }

    #[test]
    fn test_wire_schema_carries_link() {
        let line = PriceLine::new(&CatalogItem::new("C1", "Aspirin", ""), 5.0, 1.5).with_link("https://example.com/c1");
        let value = serde_json::to_value(&line).unwrap();
        assert_eq!(value["addr"], "https://example.com/c1");
        assert_eq!(value["link"], "https://example.com/c1");
        assert_eq!(value["name"], "Aspirin");
    }

    proptest! {
        #[test]
        fn prop_price_list_round_trip(
            outlet in "[A-Za-z0-9]{1,8}",
            lines in proptest::collection::vec(("[A-Z0-9]{1,6}", 0.0f64..1.0e6, 0.0f64..1.0e5), 0..20),
        ) {
            let mut list = PriceList::new(Outlet::new(outlet.clone(), "name", "TAG"));
            for (code, quant, price) in &lines {
                list.data.push(PriceLine { code: code.clone(), name: "n".into(), quant: *quant, price: *price, ..PriceLine::default() });
            }

            let json = serde_json::to_vec(&list).unwrap();
            let back: PriceList = serde_json::from_slice(&json).unwrap();

            prop_assert_eq!(back.outlet_code(), outlet.as_str());
            prop_assert_eq!(back.len(), lines.len());
            for (line, (code, quant, price)) in back.data.iter().zip(lines.iter()) {
                prop_assert_eq!(&line.code, code);
                prop_assert_eq!(line.quant, *quant);
                prop_assert_eq!(line.price, *price);
            }
        }
    }
}
