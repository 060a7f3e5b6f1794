use thiserror::Error;

pub type JwksResult<T> = Result<T, JwksError>;
pub type VerifyResult<T> = Result<T, VerificationFailure>;

/// Failures while populating the key set. These leave the verifier without
/// keys and are fatal to the hosting process.
#[derive(Debug, Error)]
pub enum JwksError {
    #[error("failed to build JWKS HTTP client: {0}")]
    Client(String),
    #[error("failed to fetch JWKS: {0}")]
    Fetch(String),
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("failed to parse JWKS response: {0}")]
    Decode(String),
    #[error("JWKS entry missing key id (kid)")]
    MissingKid,
    #[error("JWKS at {0} contains no keys")]
    Empty(String),
    #[error("no JWKS source configured")]
    NotConfigured,
}

/// Reasons a single token is rejected. Every variant is a definitive,
/// ordinary outcome for the token, not a fault of the verifier.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VerificationFailure {
    #[error("malformed token: {0}")]
    MalformedToken(String),
    #[error("no signing key registered for kid '{0}'")]
    KeyNotFound(String),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("signature verification failed")]
    SignatureInvalid,
    #[error("token expired at {exp} (now {now})")]
    TokenExpired { exp: f64, now: i64 },
    #[error("token was not issued for audience '{expected}' (got '{actual}')")]
    AudienceMismatch { expected: String, actual: String },
}

impl VerificationFailure {
    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedToken(detail.into())
    }

    /// Stable, machine-readable reason code.
    pub fn reason(&self) -> &'static str {
        match self {
            VerificationFailure::MalformedToken(_) => "malformed_token",
            VerificationFailure::KeyNotFound(_) => "key_not_found",
            VerificationFailure::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            VerificationFailure::SignatureInvalid => "signature_invalid",
            VerificationFailure::TokenExpired { .. } => "token_expired",
            VerificationFailure::AudienceMismatch { .. } => "audience_mismatch",
        }
    }
}
