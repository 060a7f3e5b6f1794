pub mod cache;
pub mod claims;
pub mod config;
pub mod error;
pub mod jwks;
pub mod token;
pub mod verifier;

pub use cache::{KeySet, KeySetCache};
pub use claims::Claims;
pub use config::{cognito_jwks_url, AudienceClaim, VerifierConfig};
pub use error::{JwksError, JwksResult, VerificationFailure, VerifyResult};
pub use jwks::{JwksFetcher, SigningKey, DEFAULT_FETCH_TIMEOUT};
pub use verifier::{TokenVerifier, TokenVerifierBuilder};

pub use jsonwebtoken::Algorithm;
