use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{
    encode::IsNull,
    error::BoxDynError,
    postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef},
    Decode, Encode, FromRow, Postgres, Type,
};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

// ═══════════════════════════════════════════════════════════════════════════
// IDENTIFIERS
// ═══════════════════════════════════════════════════════════════════════════

/// Length of a hex-encoded query identifier.
pub const QUERY_ID_LEN: usize = 24;

const COUNTER_MASK: u32 = 0x00FF_FFFF;

static PROCESS_UNIQUE: Lazy<[u8; 5]> = Lazy::new(|| rand::thread_rng().gen());
static COUNTER: Lazy<AtomicU32> =
    Lazy::new(|| AtomicU32::new(rand::thread_rng().gen::<u32>() & COUNTER_MASK));

/// Store-assigned identifier of a query.
///
/// Shaped like a document-store object id: 12 bytes rendered as 24 lowercase
/// hex characters (4 bytes of Unix seconds, 5 process-random bytes and a
/// 3-byte counter).
///
/// Every construction path (generation, `parse`, JSON and database decoding)
/// enforces that shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct QueryId(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid query id `{0}`: expected 24 hex characters")]
pub struct InvalidQueryId(pub String);

impl QueryId {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        let secs = Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
        let count = COUNTER.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&*PROCESS_UNIQUE);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);

        Self(hex::encode(bytes))
    }

    /// Parse a caller-supplied identifier.
    ///
    /// Accepts exactly 24 ASCII hex digits in either case and normalises to
    /// lowercase. Returns `None` for anything else.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() != QUERY_ID_LEN || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Seconds since the Unix epoch encoded in the first four bytes.
    pub fn timestamp_secs(&self) -> u32 {
        self.0
            .get(..8)
            .and_then(|prefix| u32::from_str_radix(prefix, 16).ok())
            .unwrap_or(0)
    }
}

impl TryFrom<String> for QueryId {
    type Error = InvalidQueryId;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        QueryId::parse(&raw).ok_or(InvalidQueryId(raw))
    }
}

impl Type<Postgres> for QueryId {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <String as Type<Postgres>>::compatible(ty)
    }
}

impl<'q> Encode<'q, Postgres> for QueryId {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        <String as Encode<'q, Postgres>>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> Decode<'r, Postgres> for QueryId {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let raw = <String as Decode<'r, Postgres>>::decode(value)?;
        Ok(QueryId::try_from(raw)?)
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for QueryId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// QUERY TYPES
// ═══════════════════════════════════════════════════════════════════════════

/// A persisted contact-form submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Query {
    pub id: QueryId,
    pub email: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Request body for submitting a new query.
///
/// Missing fields decode as empty strings so that the validation gate, not the
/// JSON decoder, reports them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateQueryRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

impl CreateQueryRequest {
    pub fn new(email: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            message: message.into(),
        }
    }
}

/// Plain `{ "message": ... }` response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_24_lowercase_hex() {
        let id = QueryId::generate();
        assert_eq!(id.as_str().len(), QUERY_ID_LEN);
        assert!(id
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn generated_ids_are_distinct() {
        let a = QueryId::generate();
        let b = QueryId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn generated_id_embeds_creation_time() {
        let before = Utc::now().timestamp() as u32;
        let id = QueryId::generate();
        let after = Utc::now().timestamp() as u32;
        assert!(id.timestamp_secs() >= before && id.timestamp_secs() <= after);
    }

    #[test]
    fn parse_normalises_case() {
        let id = QueryId::parse("507F1F77BCF86CD799439011").unwrap();
        assert_eq!(id.as_str(), "507f1f77bcf86cd799439011");
    }

    #[test]
    fn parse_rejects_wrong_shape() {
        assert!(QueryId::parse("xyz").is_none());
        assert!(QueryId::parse("123").is_none());
        assert!(QueryId::parse("").is_none());
        assert!(QueryId::parse("507f1f77bcf86cd79943901").is_none());
        assert!(QueryId::parse("507f1f77bcf86cd7994390111").is_none());
        assert!(QueryId::parse("507f1f77bcf86cd79943901g").is_none());
    }

    #[test]
    fn deserialize_goes_through_parse() {
        let err = serde_json::from_str::<QueryId>("\"xyz\"").unwrap_err();
        assert!(err.to_string().contains("invalid query id `xyz`"));

        let id: QueryId = serde_json::from_str("\"507F1F77BCF86CD799439011\"").unwrap();
        assert_eq!(id.as_str(), "507f1f77bcf86cd799439011");
    }

    #[test]
    fn try_from_rejects_malformed_ids() {
        assert_eq!(
            QueryId::try_from("xyz".to_string()),
            Err(InvalidQueryId("xyz".to_string()))
        );
        assert!(QueryId::try_from("507f1f77bcf86cd799439011".to_string()).is_ok());
    }

    #[test]
    fn query_with_malformed_id_does_not_deserialize() {
        let body = r#"{"id":"not-an-id","email":"a@b.com","message":"hi","created_at":"2024-01-01T00:00:00Z"}"#;
        assert!(serde_json::from_str::<Query>(body).is_err());
    }

    #[test]
    fn create_request_defaults_missing_fields() {
        let req: CreateQueryRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req, CreateQueryRequest::default());
    }

    #[test]
    fn query_serializes_id_as_string() {
        let query = Query {
            id: QueryId::parse("507f1f77bcf86cd799439011").unwrap(),
            email: "a@b.com".into(),
            message: "hello".into(),
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value["id"], "507f1f77bcf86cd799439011");
        assert_eq!(value["email"], "a@b.com");
    }
}
