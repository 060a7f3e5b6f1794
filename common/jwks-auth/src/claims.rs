use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::AudienceClaim;
use crate::error::{VerificationFailure, VerifyResult};

/// Claims of a token whose signature, expiration and audience all checked out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Claims {
    inner: Map<String, Value>,
}

impl Claims {
    pub(crate) fn new(inner: Map<String, Value>) -> Self {
        Self { inner }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.inner.get(name)
    }

    pub fn subject(&self) -> Option<&str> {
        self.inner.get("sub").and_then(Value::as_str)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let exp = self.inner.get("exp").and_then(Value::as_f64)?;
        Utc.timestamp_opt(exp.trunc() as i64, 0).single()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.inner
    }
}

impl From<Claims> for Value {
    fn from(claims: Claims) -> Self {
        Value::Object(claims.inner)
    }
}

/// Valid through the expiration instant itself.
pub(crate) fn check_expiration(
    claims: &Map<String, Value>,
    now: i64,
    leeway_seconds: u32,
) -> VerifyResult<()> {
    let exp = match claims.get("exp") {
        Some(Value::Number(exp)) => exp
            .as_f64()
            .ok_or_else(|| VerificationFailure::malformed("claim 'exp' is out of range"))?,
        Some(_) => return Err(VerificationFailure::malformed("claim 'exp' is not numeric")),
        None => return Err(VerificationFailure::malformed("missing claim 'exp'")),
    };

    if now as f64 > exp + f64::from(leeway_seconds) {
        return Err(VerificationFailure::TokenExpired { exp, now });
    }
    Ok(())
}

/// Exact, case-sensitive comparison against a single string claim.
pub(crate) fn check_audience(
    claims: &Map<String, Value>,
    claim: AudienceClaim,
    expected: &str,
) -> VerifyResult<()> {
    let name = claim.as_str();
    let actual = match claims.get(name) {
        Some(Value::String(actual)) => actual,
        Some(_) => {
            return Err(VerificationFailure::malformed(format!(
                "claim '{name}' is not a string"
            )))
        }
        None => return Err(VerificationFailure::malformed(format!("missing claim '{name}'"))),
    };

    if actual != expected {
        return Err(VerificationFailure::AudienceMismatch {
            expected: expected.to_string(),
            actual: actual.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn expiration_is_inclusive() {
        let claims = map(json!({"exp": 100}));
        assert!(check_expiration(&claims, 50, 0).is_ok());
        assert!(check_expiration(&claims, 100, 0).is_ok());
        assert_eq!(
            check_expiration(&claims, 101, 0),
            Err(VerificationFailure::TokenExpired { exp: 100.0, now: 101 })
        );
    }

    #[test]
    fn expiration_honours_leeway() {
        let claims = map(json!({"exp": 100}));
        assert!(check_expiration(&claims, 130, 30).is_ok());
        assert!(check_expiration(&claims, 131, 30).is_err());
    }

    #[test]
    fn fractional_exp_is_numeric() {
        let claims = map(json!({"exp": 100.5}));
        assert!(check_expiration(&claims, 100, 0).is_ok());
        assert!(check_expiration(&claims, 101, 0).is_err());
    }

    #[test]
    fn missing_or_non_numeric_exp_is_malformed() {
        for claims in [
            json!({}),
            json!({"exp": "100"}),
            json!({"exp": null}),
            json!({"exp": true}),
        ] {
            let err = check_expiration(&map(claims), 0, 0).expect_err("must fail");
            assert_eq!(err.reason(), "malformed_token");
        }
    }

    #[test]
    fn audience_must_match_exactly() {
        let claims = map(json!({"aud": "client123", "client_id": "other"}));
        assert!(check_audience(&claims, AudienceClaim::Aud, "client123").is_ok());
        assert_eq!(
            check_audience(&claims, AudienceClaim::Aud, "CLIENT123")
                .expect_err("case matters")
                .reason(),
            "audience_mismatch"
        );
        assert!(check_audience(&claims, AudienceClaim::ClientId, "other").is_ok());
    }

    #[test]
    fn missing_or_non_string_audience_is_malformed() {
        for claims in [json!({}), json!({"aud": ["client123"]}), json!({"aud": 5})] {
            let err = check_audience(&map(claims), AudienceClaim::Aud, "client123")
                .expect_err("must fail");
            assert_eq!(err.reason(), "malformed_token");
        }
    }

    #[test]
    fn accessors_read_through() {
        let claims = Claims::new(map(json!({"sub": "abc", "exp": 1560120789, "aud": "x"})));
        assert_eq!(claims.subject(), Some("abc"));
        assert_eq!(claims.expires_at().map(|at| at.timestamp()), Some(1560120789));
        assert_eq!(
            serde_json::to_value(&claims).expect("serialises"),
            json!({"sub": "abc", "exp": 1560120789, "aud": "x"})
        );
        let raw = claims.into_inner();
        assert_eq!(raw.get("aud"), Some(&Value::from("x")));
        assert_eq!(raw.len(), 3);
    }
}
