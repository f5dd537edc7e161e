//! Subscription notification envelope and the fixed subscribe request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StreamError;
use crate::transaction::Transaction;

/// The one subscribe request sent after every successful dial.
pub const SUBSCRIBE_REQUEST: &str =
    r#"{"id": 1, "method": "subscribe", "params": ["newTxs", {"include": ["tx_contents"]}]}"#;

/// A subscribe response containing this marker is a rejected subscription.
pub const ERROR_MARKER: &str = r#""error""#;

/// Returns `true` if the subscribe response signals failure.
pub fn is_rejection(response: &str) -> bool {
    response.contains(ERROR_MARKER)
}

/// Outer notification pushed by the feed:
///
/// ```text
/// {"jsonrpc": "2.0", "id": null, "method": "subscribe",
///  "params": {"subscription": "<uuid>", "result": {"txContents": {...}}}}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Option<NotificationParams>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationParams {
    pub subscription: String,
    #[serde(default)]
    pub result: Option<NotificationResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationResult {
    #[serde(rename = "txContents", default)]
    pub tx_contents: Option<Transaction>,
}

impl Notification {
    /// Strictly decode one wire message.
    pub fn decode(text: &str) -> Result<Self, StreamError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Subscription id, if the params block is present.
    pub fn subscription(&self) -> Option<&str> {
        self.params.as_ref().map(|p| p.subscription.as_str())
    }

    /// Unwrap the nested transaction. A notification without one is a
    /// protocol error, not a message to skip.
    pub fn into_transaction(self) -> Result<Transaction, StreamError> {
        self.params
            .and_then(|p| p.result)
            .and_then(|r| r.tx_contents)
            .ok_or(StreamError::MissingRecord)
    }
}

/// Decode a wire message, unwrap its transaction and validate it.
pub fn parse_transaction(text: &str) -> Result<Transaction, StreamError> {
    let tx = Notification::decode(text)?.into_transaction()?;
    tx.validate()?;
    Ok(tx)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"jsonrpc": "2.0", "id": null, "method": "subscribe", "params": {"subscription": "c294f047-ec21-43f2-b9da-13e867365f42", "result": {"txContents": {"from": "0x50d6bdfc451314fb162d7d3322bfb4a005cf192f", "gas": "0x7a120", "gasPrice": "0x17bfac7c00", "hash": "0xeef70455ea7118ff6d99883b855d85c045b7f471eab454ea45728b8c4d8b227c", "input": "0x202ee0ed", "nonce": "0xd0e2", "value": "0x0", "v": "0x25", "r": "0x33b2", "s": "0x2628", "to": "0xd286af227b7b0695387e279b9956540818b1dc2a"}}}}"#;

    #[test]
    fn decode_sample_notification() {
        let n = Notification::decode(SAMPLE).unwrap();
        assert_eq!(n.jsonrpc, "2.0");
        assert_eq!(n.method, "subscribe");
        assert!(n.id.is_null());
        assert_eq!(n.subscription(), Some("c294f047-ec21-43f2-b9da-13e867365f42"));

        let tx = n.into_transaction().unwrap();
        assert_eq!(tx.nonce, "0xd0e2");
        assert_eq!(tx.value.as_deref(), Some("0x0"));
    }

    #[test]
    fn parse_transaction_accepts_sample() {
        let tx = parse_transaction(SAMPLE).unwrap();
        assert!(tx.hash.starts_with("0xeef7"));
    }

    #[test]
    fn missing_nesting_is_protocol_error() {
        for text in [
            r#"{"jsonrpc":"2.0","method":"subscribe"}"#,
            r#"{"jsonrpc":"2.0","method":"subscribe","params":{"subscription":"x"}}"#,
            r#"{"jsonrpc":"2.0","method":"subscribe","params":{"subscription":"x","result":{}}}"#,
        ] {
            assert!(matches!(
                parse_transaction(text),
                Err(StreamError::MissingRecord)
            ));
        }
    }

    #[test]
    fn malformed_json_is_decode_error() {
        assert!(matches!(parse_transaction("not json"), Err(StreamError::Decode(_))));
        assert!(matches!(
            parse_transaction(r#"{"jsonrpc":"2.0","method":"subscribe","params":"newTxs"}"#),
            Err(StreamError::Decode(_))
        ));
        assert!(matches!(
            parse_transaction(r#"{"method":"subscribe"}"#),
            Err(StreamError::Decode(_))
        ));
    }

    #[test]
    fn invalid_transaction_is_validation_error() {
        let text = SAMPLE.replace(r#""nonce": "0xd0e2""#, r#""nonce": """#);
        match parse_transaction(&text) {
            Err(StreamError::Validation(e)) => assert_eq!(e.field(), "nonce"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn null_hash_is_validation_error() {
        let text = SAMPLE.replace(
            r#""hash": "0xeef70455ea7118ff6d99883b855d85c045b7f471eab454ea45728b8c4d8b227c""#,
            r#""hash": null"#,
        );
        assert!(text.contains(r#""hash": null"#));
        match parse_transaction(&text) {
            Err(StreamError::Validation(e)) => assert_eq!(e.field(), "hash"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn rejection_marker() {
        assert!(is_rejection(r#"{"id":1,"error":{"code":-32600,"message":"denied"}}"#));
        assert!(!is_rejection(r#"{"id":1,"result":"c294f047"}"#));
    }

    #[test]
    fn subscribe_request_is_valid_json() {
        let v: Value = serde_json::from_str(SUBSCRIBE_REQUEST).unwrap();
        assert_eq!(v["method"], "subscribe");
        assert_eq!(v["params"][0], "newTxs");
        assert_eq!(v["params"][1]["include"][0], "tx_contents");
    }
}
