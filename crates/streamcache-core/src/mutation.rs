//! Mutation records and their wire encoding.
//!
//! A [`RawRecord`] is the unit stored in the change log. It is self-describing:
//! `method` names the change and `payload` carries either a JSON-encoded
//! [`Order`] (`save`, `update`) or a bare UTF-8 order id (`delete`).

use std::fmt;
use std::str::FromStr;

use crate::error::{CacheError, Result};
use crate::order::{Order, OrderId};

/// A change log record as stored and transported, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub method: String,
    pub payload: Vec<u8>,
}

impl RawRecord {
    pub fn new(method: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            method: method.into(),
            payload: payload.into(),
        }
    }
}

/// The kind of change a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Save,
    Update,
    Delete,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Save => "save",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MutationKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "save" => Ok(Self::Save),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "" => Err(CacheError::decode("", "record has no method")),
            other => Err(CacheError::unknown_kind(other)),
        }
    }
}

/// A decoded change to apply to the local store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Save(Order),
    Update(Order),
    Delete(OrderId),
}

impl Mutation {
    pub fn kind(&self) -> MutationKind {
        match self {
            Self::Save(_) => MutationKind::Save,
            Self::Update(_) => MutationKind::Update,
            Self::Delete(_) => MutationKind::Delete,
        }
    }

    /// The id of the order this mutation targets.
    pub fn order_id(&self) -> &OrderId {
        match self {
            Self::Save(order) | Self::Update(order) => &order.id,
            Self::Delete(id) => id,
        }
    }

    /// Encode into the wire record appended to the change log.
    pub fn encode(&self) -> Result<RawRecord> {
        let payload = match self {
            Self::Save(order) | Self::Update(order) => serde_json::to_vec(order)
                .map_err(|e| CacheError::encode(self.kind().as_str(), e.to_string()))?,
            Self::Delete(id) => id.as_str().as_bytes().to_vec(),
        };
        Ok(RawRecord::new(self.kind().as_str(), payload))
    }

    /// Decode a record read from the change log.
    ///
    /// Each record is decoded on its own; nothing here depends on records
    /// seen earlier.
    pub fn decode(record: &RawRecord) -> Result<Self> {
        let kind: MutationKind = record.method.parse()?;
        match kind {
            MutationKind::Save | MutationKind::Update => {
                let order: Order = serde_json::from_slice(&record.payload)
                    .map_err(|e| CacheError::decode(kind.as_str(), e.to_string()))?;
                if order.id.is_empty() {
                    return Err(CacheError::decode(kind.as_str(), "order has an empty id"));
                }
                Ok(if kind == MutationKind::Save {
                    Self::Save(order)
                } else {
                    Self::Update(order)
                })
            }
            MutationKind::Delete => {
                // The id is taken verbatim: ids are arbitrary strings and must
                // match the key an earlier save or update stored.
                let id = std::str::from_utf8(&record.payload)
                    .map_err(|e| CacheError::decode(kind.as_str(), e.to_string()))?;
                if id.is_empty() {
                    return Err(CacheError::decode(kind.as_str(), "empty order id"));
                }
                Ok(Self::Delete(OrderId::new(id)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> Order {
        Order::new(OrderId::new("X"), "widget", 10, false)
    }

    #[test]
    fn test_encode_save_payload_is_order_json() {
        let record = Mutation::Save(widget()).encode().unwrap();
        assert_eq!(record.method, "save");
        let json: serde_json::Value = serde_json::from_slice(&record.payload).unwrap();
        assert_eq!(json["orderID"], "X");
        assert_eq!(json["orderCost"], 10);
    }

    #[test]
    fn test_encode_delete_payload_is_bare_id() {
        let record = Mutation::Delete(OrderId::new("X")).encode().unwrap();
        assert_eq!(record, RawRecord::new("delete", b"X".to_vec()));
    }

    #[test]
    fn test_decode_update() {
        let record = RawRecord::new(
            "update",
            br#"{"orderID":"X","orderName":"widget","orderCost":20,"isDelivered":true}"#.to_vec(),
        );
        match Mutation::decode(&record).unwrap() {
            Mutation::Update(order) => {
                assert_eq!(order.id.as_str(), "X");
                assert_eq!(order.cost, 20);
                assert!(order.delivered);
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_unknown_method() {
        let err = Mutation::decode(&RawRecord::new("upsert", b"{}".to_vec())).unwrap_err();
        assert_eq!(err, CacheError::unknown_kind("upsert"));
    }

    #[test]
    fn test_decode_missing_method() {
        let err = Mutation::decode(&RawRecord::new("", b"X".to_vec())).unwrap_err();
        assert!(matches!(err, CacheError::Decode { .. }));
    }

    #[test]
    fn test_decode_malformed_payload() {
        let err = Mutation::decode(&RawRecord::new("save", b"{not json".to_vec())).unwrap_err();
        assert!(matches!(err, CacheError::Decode { ref method, .. } if method == "save"));

        // Unknown fields are tolerated; only structurally invalid orders fail.
        let decoded = Mutation::decode(&RawRecord::new(
            "save",
            br#"{"orderID":"X","orderName":"w","orderCost":1,"isDelivered":false,"extra":1}"#
                .to_vec(),
        ));
        assert!(decoded.is_ok());

        let err = Mutation::decode(&RawRecord::new(
            "save",
            br#"{"orderID":"X","orderName":"w","orderCost":"ten","isDelivered":false}"#.to_vec(),
        ))
        .unwrap_err();
        assert!(matches!(err, CacheError::Decode { .. }));

        let err = Mutation::decode(&RawRecord::new(
            "update",
            br#"{"orderID":"","orderName":"w","orderCost":1,"isDelivered":false}"#.to_vec(),
        ))
        .unwrap_err();
        assert!(matches!(err, CacheError::Decode { .. }));
    }

    #[test]
    fn test_decode_delete_rejects_empty_or_binary_ids() {
        assert!(Mutation::decode(&RawRecord::new("delete", Vec::new())).is_err());
        assert!(Mutation::decode(&RawRecord::new("delete", vec![0xff, 0xfe])).is_err());
    }

    #[test]
    fn test_delete_keeps_surrounding_whitespace_in_id() {
        let mutation = Mutation::Delete(OrderId::new(" padded "));
        let decoded = Mutation::decode(&mutation.encode().unwrap()).unwrap();
        assert_eq!(decoded, mutation);
        assert_eq!(decoded.order_id().as_str(), " padded ");

        // A whitespace-only id is still an id.
        let decoded = Mutation::decode(&RawRecord::new("delete", b" ".to_vec())).unwrap();
        assert_eq!(decoded, Mutation::Delete(OrderId::new(" ")));
    }

    #[test]
    fn test_order_id_accessor() {
        assert_eq!(Mutation::Save(widget()).order_id().as_str(), "X");
        assert_eq!(Mutation::Delete(OrderId::new("Y")).order_id().as_str(), "Y");
        assert_eq!(Mutation::Update(widget()).kind(), MutationKind::Update);
    }
}
