//! GraphQL request bodies and response decoding for announcement details

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Announcement details query; the result is aliased to `announcement`
pub const ANNOUNCEMENT_QUERY: &str = r#"
query AnnouncementGet($id: ID!) {
  announcement: announcementDetails(id: $id) {
    id
    reference
    title
    slug
    description
    createdAt: refreshedAt
    price
    priceType
    priceUnit
    street_name
    category { id name slug }
    specs {
      specification { label codename type }
      value
      valueText
    }
    cities {
      id
      name
      region { id name slug }
    }
    medias { mediaUrl mimeType }
    user { id username displayName }
  }
}
"#;

#[derive(Serialize)]
struct Request<'a, V> {
    query: &'a str,
    variables: V,
}

#[derive(Serialize)]
struct IdVariables<'a> {
    id: &'a str,
}

/// Serialize `{query, variables}` for one POST
pub fn request_body<V: Serialize>(query: &str, variables: V) -> Vec<u8> {
    // Serializing plain structs of strings cannot fail
    serde_json::to_vec(&Request { query, variables }).unwrap_or_default()
}

/// Body of the details request for one identifier
pub fn announcement_request(id: &str) -> Vec<u8> {
    request_body(ANNOUNCEMENT_QUERY, IdVariables { id })
}

#[derive(Deserialize)]
struct Envelope<D> {
    data: Option<D>,
    errors: Option<Value>,
}

#[derive(Deserialize)]
struct AnnouncementData {
    announcement: Option<Value>,
}

/// What a 200 response said about one identifier
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    /// Remote reported errors; final, not retried
    Errors(Value),
    /// Announcement document
    Found(Value),
    /// Remote returned null for the id
    NotFound,
}

/// Decode a details response body.
///
/// An `errors` entry wins over any partial `data`. Malformed JSON is an
/// error so the caller can retry it like a transport failure.
pub fn decode_announcement(body: &[u8]) -> Result<Answer, serde_json::Error> {
    let envelope: Envelope<AnnouncementData> = serde_json::from_slice(body)?;
    if let Some(errors) = envelope.errors.filter(|e| !e.is_null()) {
        return Ok(Answer::Errors(errors));
    }
    Ok(match envelope.data.and_then(|d| d.announcement) {
        Some(doc) => Answer::Found(doc),
        None => Answer::NotFound,
    })
}

/// Decode a search response page (`data.search.announcements`) for the listing crawler
pub fn decode_envelope<D: DeserializeOwned>(
    body: &[u8],
) -> Result<(Option<D>, Option<Value>), serde_json::Error> {
    let envelope: Envelope<D> = serde_json::from_slice(body)?;
    Ok((envelope.data, envelope.errors.filter(|e| !e.is_null())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_carries_id_variable() {
        let body: Value = serde_json::from_slice(&announcement_request("38122211")).unwrap();
        assert_eq!(body["variables"], json!({"id": "38122211"}));
        assert!(body["query"].as_str().unwrap().contains("announcementDetails"));
    }

    #[test]
    fn decode_found() {
        let body = br#"{"data": {"announcement": {"id": "1", "title": "F3"}}}"#;
        assert_eq!(
            decode_announcement(body).unwrap(),
            Answer::Found(json!({"id": "1", "title": "F3"}))
        );
    }

    #[test]
    fn decode_null_announcement() {
        let body = br#"{"data": {"announcement": null}}"#;
        assert_eq!(decode_announcement(body).unwrap(), Answer::NotFound);
    }

    #[test]
    fn decode_missing_data() {
        assert_eq!(decode_announcement(b"{}").unwrap(), Answer::NotFound);
        assert_eq!(
            decode_announcement(br#"{"data": null}"#).unwrap(),
            Answer::NotFound
        );
    }

    #[test]
    fn decode_errors_take_precedence() {
        let body = br#"{"data": {"announcement": null}, "errors": [{"message": "Not found"}]}"#;
        assert_eq!(
            decode_announcement(body).unwrap(),
            Answer::Errors(json!([{"message": "Not found"}]))
        );
    }

    #[test]
    fn decode_null_errors_ignored() {
        let body = br#"{"data": {"announcement": {"id": "1"}}, "errors": null}"#;
        assert_eq!(
            decode_announcement(body).unwrap(),
            Answer::Found(json!({"id": "1"}))
        );
    }

    #[test]
    fn decode_malformed_is_error() {
        assert!(decode_announcement(b"<html>502 Bad Gateway</html>").is_err());
        assert!(decode_announcement(b"[1, 2]").is_err());
    }
}
