use jsonwebtoken::Algorithm;

/// Claim that carries the expected audience.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudienceClaim {
    /// `aud`, present on ID tokens.
    Aud,
    /// `client_id`, present on access tokens.
    ClientId,
}

impl AudienceClaim {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudienceClaim::Aud => "aud",
            AudienceClaim::ClientId => "client_id",
        }
    }
}

/// Runtime configuration for token verification.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Expected audience (the app client id).
    pub audience: String,
    /// Claim compared against `audience`.
    pub audience_claim: AudienceClaim,
    /// Algorithms a signing key may declare. Anything else is rejected.
    pub allowed_algorithms: Vec<Algorithm>,
    /// Allowable clock skew in seconds when validating exp.
    pub leeway_seconds: u32,
}

impl VerifierConfig {
    /// RS256 only, `aud` claim, no leeway.
    pub fn new(audience: impl Into<String>) -> Self {
        Self {
            audience: audience.into(),
            audience_claim: AudienceClaim::Aud,
            allowed_algorithms: vec![Algorithm::RS256],
            leeway_seconds: 0,
        }
    }

    pub fn with_leeway(mut self, seconds: u32) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    pub fn with_allowed_algorithms(
        mut self,
        algorithms: impl IntoIterator<Item = Algorithm>,
    ) -> Self {
        self.allowed_algorithms = algorithms.into_iter().collect();
        self
    }

    pub fn with_audience_claim(mut self, claim: AudienceClaim) -> Self {
        self.audience_claim = claim;
        self
    }
}

/// Public JWKS location of a Cognito user pool.
pub fn cognito_jwks_url(region: &str, user_pool_id: &str) -> String {
    format!("https://cognito-idp.{region}.amazonaws.com/{user_pool_id}/.well-known/jwks.json")
}
