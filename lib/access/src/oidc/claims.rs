//! ID token claim policy.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Map, Value};

/// A claim every accepted ID token must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredClaim {
    name: String,
    value: String,
}

impl RequiredClaim {
    /// Returns `None` unless both `name` and `value` are non-empty.
    #[must_use]
    pub fn new(name: String, value: String) -> Option<Self> {
        let name = name.trim().to_string();
        let value = value.trim().to_string();
        if name.is_empty() || value.is_empty() {
            return None;
        }
        Some(Self { name, value })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns true if the claim is a string equal to the value, an array
    /// containing it, or a number whose text form equals it.
    #[must_use]
    pub fn is_satisfied_by(&self, claims: &Map<String, Value>) -> bool {
        match claims.get(&self.name) {
            Some(Value::String(s)) => *s == self.value,
            Some(Value::Array(items)) => items
                .iter()
                .any(|item| item.as_str() == Some(self.value.as_str())),
            Some(Value::Number(n)) => n.to_string() == self.value,
            _ => false,
        }
    }
}

/// Errors decoding the payload of a compact JWT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimsError {
    /// The token is not three dot-separated segments.
    Format,
    /// The payload segment is not base64url.
    Encoding { details: String },
    /// The payload is not a JSON object.
    Json { details: String },
}

impl std::fmt::Display for ClaimsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Format => write!(f, "ID token is not a compact JWT"),
            Self::Encoding { details } => write!(f, "cannot decode ID token payload: {details}"),
            Self::Json { details } => write!(f, "cannot parse ID token payload: {details}"),
        }
    }
}

impl std::error::Error for ClaimsError {}

/// Decodes the claims object of a compact JWT.
///
/// The signature is not checked here; call this only on a token that was
/// already verified.
pub fn decode_payload(token: &str) -> Result<Map<String, Value>, ClaimsError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(ClaimsError::Format);
    }

    let payload = URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|e| ClaimsError::Encoding {
            details: e.to_string(),
        })?;

    serde_json::from_slice(&payload).map_err(|e| ClaimsError::Json {
        details: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("claims must be an object"),
        }
    }

    fn groups_claim(value: &str) -> RequiredClaim {
        RequiredClaim::new("groups".to_string(), value.to_string()).expect("claim")
    }

    #[test]
    fn string_claim_must_match_exactly() {
        let claim = groups_claim("admins");
        assert!(claim.is_satisfied_by(&claims(json!({"groups": "admins"}))));
        assert!(!claim.is_satisfied_by(&claims(json!({"groups": "admins-readonly"}))));
    }

    #[test]
    fn array_claim_must_contain_value() {
        let claim = groups_claim("admins");
        assert!(claim.is_satisfied_by(&claims(json!({"groups": ["users", "admins"]}))));
        assert!(!claim.is_satisfied_by(&claims(json!({"groups": ["users", ["admins"]]}))));
        assert!(!claim.is_satisfied_by(&claims(json!({"groups": []}))));
    }

    #[test]
    fn numeric_claim_compares_text_form() {
        let claim = RequiredClaim::new("tier".to_string(), "3".to_string()).expect("claim");
        assert!(claim.is_satisfied_by(&claims(json!({"tier": 3}))));
        assert!(!claim.is_satisfied_by(&claims(json!({"tier": 4}))));
    }

    #[test]
    fn missing_or_boolean_claim_is_not_satisfied() {
        let claim = groups_claim("true");
        assert!(!claim.is_satisfied_by(&claims(json!({"sub": "alice"}))));
        assert!(!claim.is_satisfied_by(&claims(json!({"groups": true}))));
        assert!(!claim.is_satisfied_by(&claims(json!({"groups": null}))));
    }

    #[test]
    fn blank_name_or_value_is_no_requirement() {
        assert!(RequiredClaim::new(" ".to_string(), "x".to_string()).is_none());
        assert!(RequiredClaim::new("groups".to_string(), String::new()).is_none());
    }

    #[test]
    fn decodes_jwt_payload() {
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"alice","groups":["admins"]}"#);
        let token = format!("eyJhbGciOiJSUzI1NiJ9.{payload}.c2ln");

        let decoded = decode_payload(&token).expect("decode");
        assert_eq!(decoded.get("sub"), Some(&json!("alice")));
        assert_eq!(decoded.get("groups"), Some(&json!(["admins"])));
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert_eq!(decode_payload("not-a-jwt"), Err(ClaimsError::Format));
        assert!(matches!(
            decode_payload("a.!!!.c"),
            Err(ClaimsError::Encoding { .. })
        ));
        let payload = URL_SAFE_NO_PAD.encode(b"[1,2]");
        assert!(matches!(
            decode_payload(&format!("a.{payload}.c")),
            Err(ClaimsError::Json { .. })
        ));
    }
}
