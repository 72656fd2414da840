use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::storage::StoreError;

/// The fixed set of record collections. The serialized form is the name used
/// on the wire and for the backing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Collection {
    #[serde(rename = "konten")]
    Accounts,
    #[serde(rename = "buchungen")]
    Postings,
    #[serde(rename = "waren")]
    Goods,
    #[serde(rename = "lagerbewegungen")]
    InventoryMovements,
    #[serde(rename = "bestellungen")]
    Orders,
    #[serde(rename = "users")]
    Users,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Accounts,
        Collection::Postings,
        Collection::Goods,
        Collection::InventoryMovements,
        Collection::Orders,
        Collection::Users,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Accounts => "konten",
            Collection::Postings => "buchungen",
            Collection::Goods => "waren",
            Collection::InventoryMovements => "lagerbewegungen",
            Collection::Orders => "bestellungen",
            Collection::Users => "users",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| StoreError::UnknownCollection(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_names() {
        for collection in Collection::ALL {
            assert_eq!(collection.as_str().parse::<Collection>().unwrap(), collection);
        }
        assert_eq!("waren".parse::<Collection>().unwrap(), Collection::Goods);
    }

    #[test]
    fn test_parse_rejects_unknown_names() {
        assert!(matches!("accounts".parse::<Collection>(), Err(StoreError::UnknownCollection(_))));
        assert!("Konten".parse::<Collection>().is_err());
        assert!("".parse::<Collection>().is_err());
    }

    #[test]
    fn test_file_name() {
        assert_eq!(Collection::InventoryMovements.file_name(), "lagerbewegungen.json");
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&Collection::Orders).unwrap();
        assert_eq!(json, "\"bestellungen\"");
    }
}
