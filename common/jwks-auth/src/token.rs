use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde_json::{Map, Value};

use crate::error::{VerificationFailure, VerifyResult};

/// Base64url that tolerates trailing padding on input.
const SEGMENT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Header fields consulted before the signature is checked. Untrusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnverifiedHeader {
    pub kid: String,
    pub alg: String,
}

/// A compact token split into its segments. Borrows from the input so the
/// signing input is always the caller's exact bytes.
#[derive(Debug, Clone, Copy)]
pub struct CompactToken<'a> {
    raw: &'a str,
    header: &'a str,
    payload: &'a str,
    signature: &'a str,
}

impl<'a> CompactToken<'a> {
    pub fn parse(raw: &'a str) -> VerifyResult<Self> {
        let mut segments = raw.split('.');
        let (Some(header), Some(payload), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(VerificationFailure::malformed(
                "expected three dot-separated segments",
            ));
        };
        Ok(Self {
            raw,
            header,
            payload,
            signature,
        })
    }

    pub fn header(&self) -> VerifyResult<UnverifiedHeader> {
        let bytes = decode_segment(self.header, "header")?;
        let mut header = match serde_json::from_slice(&bytes) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err(VerificationFailure::malformed("header is not a JSON object")),
            Err(err) => {
                let message = format!("header is not valid JSON: {err}");
                return Err(VerificationFailure::malformed(message));
            }
        };
        Ok(UnverifiedHeader {
            kid: string_field(header.remove("kid"), "kid")?,
            alg: string_field(header.remove("alg"), "alg")?,
        })
    }

    /// `header "." payload`, sliced verbatim from the input.
    pub fn signing_input(&self) -> &'a str {
        &self.raw[..self.header.len() + 1 + self.payload.len()]
    }

    /// Signature segment, still base64url encoded.
    pub fn signature(&self) -> &'a str {
        self.signature
    }

    pub fn claims(&self) -> VerifyResult<Map<String, Value>> {
        let bytes = decode_segment(self.payload, "payload")?;
        match serde_json::from_slice(&bytes) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(VerificationFailure::malformed("payload is not a JSON object")),
            Err(err) => Err(VerificationFailure::malformed(format!(
                "payload is not valid JSON: {err}"
            ))),
        }
    }
}

fn decode_segment(segment: &str, name: &str) -> VerifyResult<Vec<u8>> {
    SEGMENT_ENGINE
        .decode(segment)
        .map_err(|err| VerificationFailure::malformed(format!("{name} is not base64url: {err}")))
}

fn string_field(value: Option<Value>, name: &str) -> VerifyResult<String> {
    match value {
        Some(Value::String(value)) => Ok(value),
        Some(_) => Err(VerificationFailure::malformed(format!(
            "header field '{name}' is not a string"
        ))),
        None => Err(VerificationFailure::malformed(format!("header missing '{name}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    fn segment(json: &str) -> String {
        URL_SAFE_NO_PAD.encode(json)
    }

    #[test]
    fn parse_requires_exactly_three_segments() {
        for raw in ["", "a", "a.b", "a.b.c.d", "a.b.c.d.e"] {
            let err = CompactToken::parse(raw).expect_err("must fail");
            assert_eq!(err.reason(), "malformed_token", "input {raw:?}");
        }
        assert!(CompactToken::parse("a.b.c").is_ok());
        assert!(CompactToken::parse("..").is_ok());
    }

    #[test]
    fn signing_input_is_verbatim() {
        let header = segment(r#"{"kid":"k","alg":"RS256"}"#);
        let raw = format!("{header}.cGF5bG9hZA.c2ln");
        let token = CompactToken::parse(&raw).expect("parses");
        assert_eq!(token.signing_input(), format!("{header}.cGF5bG9hZA"));
        assert_eq!(token.signature(), "c2ln");
    }

    #[test]
    fn header_exposes_kid_and_alg() {
        let raw = format!("{}.e30.sig", segment(r#"{"kid":"abc","alg":"RS256","typ":"JWT"}"#));
        let header = CompactToken::parse(&raw).and_then(|t| t.header()).expect("header");
        assert_eq!(
            header,
            UnverifiedHeader {
                kid: "abc".into(),
                alg: "RS256".into()
            }
        );
    }

    #[test]
    fn padded_header_is_accepted() {
        let padded =
            base64::engine::general_purpose::URL_SAFE.encode(r#"{"kid":"k1","alg":"RS256"}"#);
        let raw = format!("{padded}.e30.sig");
        let header = CompactToken::parse(&raw).and_then(|t| t.header()).expect("header");
        assert_eq!(header.kid, "k1");
    }

    #[test]
    fn bad_headers_are_malformed() {
        let cases = [
            "!!!".to_string(),
            segment("not json"),
            segment(r#"["kid"]"#),
            segment(r#"{"alg":"RS256"}"#),
            segment(r#"{"kid":7,"alg":"RS256"}"#),
            segment(r#"{"kid":"k"}"#),
        ];
        for header in cases {
            let raw = format!("{header}.e30.sig");
            let err = CompactToken::parse(&raw)
                .and_then(|t| t.header())
                .expect_err("must fail");
            assert_eq!(err.reason(), "malformed_token", "header {header:?}");
        }
    }

    #[test]
    fn claims_must_be_an_object() {
        let raw = format!("h.{}.s", segment(r#"{"exp":100,"aud":"client123"}"#));
        let claims = CompactToken::parse(&raw).and_then(|t| t.claims()).expect("claims");
        assert_eq!(claims.get("aud"), Some(&Value::from("client123")));

        for payload in [segment("[1,2]"), segment("{"), "%%".to_string()] {
            let raw = format!("h.{payload}.s");
            let err = CompactToken::parse(&raw)
                .and_then(|t| t.claims())
                .expect_err("must fail");
            assert_eq!(err.reason(), "malformed_token");
        }
    }
}
