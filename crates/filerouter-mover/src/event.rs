//! Inbound notification decoding
//!
//! Batches arrive in the S3 event notification shape:
//!
//! ```json
//! {"Records": [{"s3": {"bucket": {"name": "src"}, "object": {"key": "Inbox/my+file%281%29.csv"}}}]}
//! ```
//!
//! Object keys are form-urlencoded: `+` is a space and `%XX` sequences are
//! UTF-8 bytes.

use filerouter_core::{EventError, ObjectEvent};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Notification {
    #[serde(rename = "Records")]
    records: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct Record {
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: BucketEntity,
    object: ObjectEntity,
}

#[derive(Debug, Deserialize)]
struct BucketEntity {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ObjectEntity {
    key: String,
}

/// Decodes a form-urlencoded object key.
///
/// Invalid UTF-8 sequences are replaced with U+FFFD.
pub fn decode_key(raw: &str) -> String {
    // Keep literal '&' and '=' inside the single decoded name
    let escaped = raw.replace('&', "%26").replace('=', "%3D");
    url::form_urlencoded::parse(escaped.as_bytes())
        .next()
        .map(|(name, _)| name.into_owned())
        .unwrap_or_default()
}

/// Decodes a notification batch from JSON text.
pub fn parse_events(payload: &str) -> Result<Vec<ObjectEvent>, EventError> {
    let notification: Notification = serde_json::from_str(payload)?;
    Ok(into_events(notification))
}

/// Decodes a notification batch from a JSON value.
pub fn events_from_value(value: serde_json::Value) -> Result<Vec<ObjectEvent>, EventError> {
    let notification: Notification = serde_json::from_value(value)?;
    Ok(into_events(notification))
}

fn into_events(notification: Notification) -> Vec<ObjectEvent> {
    notification
        .records
        .into_iter()
        .enumerate()
        .map(|(position, record)| {
            ObjectEvent::new(record.s3.bucket.name, decode_key(&record.s3.object.key), position)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plus_and_percent() {
        assert_eq!(decode_key("Inbox/my+file%281%29.csv"), "Inbox/my file(1).csv");
        assert_eq!(decode_key("Inbox/a%2Bb.csv"), "Inbox/a+b.csv");
        assert_eq!(decode_key("Inbox/caf%C3%A9.csv"), "Inbox/café.csv");
    }

    #[test]
    fn test_decode_keeps_ampersand_and_equals() {
        assert_eq!(decode_key("Inbox/a&b=c.csv"), "Inbox/a&b=c.csv");
    }

    #[test]
    fn test_decode_plain_and_empty() {
        assert_eq!(decode_key("Inbox/data.csv"), "Inbox/data.csv");
        assert_eq!(decode_key(""), "");
    }

    #[test]
    fn test_parse_events_keeps_order() {
        let events = parse_events(
            r#"{"Records": [
                {"eventName": "ObjectCreated:Put",
                 "s3": {"bucket": {"name": "src"}, "object": {"key": "Inbox/first.csv", "size": 3}}},
                {"s3": {"bucket": {"name": "src"}, "object": {"key": "Inbox/second+file.csv"}}}
            ]}"#,
        )
        .unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0], ObjectEvent::new("src", "Inbox/first.csv", 0));
        assert_eq!(events[1].source_key, "Inbox/second file.csv");
        assert_eq!(events[1].position, 1);
    }

    #[test]
    fn test_malformed_payload() {
        assert!(matches!(
            parse_events(r#"{"records": []}"#),
            Err(EventError::Malformed { .. })
        ));
        assert!(matches!(
            parse_events(r#"{"Records": [{"s3": {"bucket": {}}}]}"#),
            Err(EventError::Malformed { .. })
        ));
    }

    #[test]
    fn test_events_from_value() {
        let value = serde_json::json!({
            "Records": [{"s3": {"bucket": {"name": "b"}, "object": {"key": "k.csv"}}}]
        });
        assert_eq!(events_from_value(value).unwrap()[0].source_key, "k.csv");
    }
}
