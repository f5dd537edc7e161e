//! Pending transaction as delivered by the feed.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

/// A pending transaction. All quantities stay in their hex-string wire form.
///
/// Missing or `null` fields decode as empty strings so that
/// [`Transaction::validate`] can name exactly which one is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Transaction hash, the deduplication key.
    #[serde(default, deserialize_with = "string_or_default")]
    pub hash: String,
    #[serde(default, deserialize_with = "string_or_default")]
    pub from: String,
    #[serde(default, deserialize_with = "string_or_default")]
    pub to: String,
    /// Gas limit.
    #[serde(default, deserialize_with = "string_or_default")]
    pub gas: String,
    #[serde(default, deserialize_with = "string_or_default")]
    pub gas_price: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, deserialize_with = "string_or_default")]
    pub nonce: String,
}

fn string_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Transaction {
    /// Check required fields in fixed order and report the first one unset.
    ///
    /// `value` and `input` are not required: contract creations and plain
    /// transfers legitimately omit one or the other.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("hash", &self.hash),
            ("from", &self.from),
            ("to", &self.to),
            ("gas", &self.gas),
            ("gasPrice", &self.gas_price),
            ("nonce", &self.nonce),
        ];
        match required.iter().find(|(_, v)| v.is_empty()) {
            Some(&(name, _)) => Err(ValidationError::MissingField(name)),
            None => Ok(()),
        }
    }
}
