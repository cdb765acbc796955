use std::{collections::HashSet, path::Path, sync::Arc};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{
    decode, decode_header, errors::ErrorKind, Algorithm, DecodingKey, Validation,
};
use serde::Deserialize;
use tracing::{debug, error};

use crate::{
    error::LicenseError,
    license::{License, LicenseClaims},
};

/// Only the RSA PKCS#1 v1.5 family is trusted for license tokens.
pub const ACCEPTED_ALGORITHMS: [Algorithm; 3] =
    [Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];

/// Verifies signed license tokens against a fixed RSA public key.
#[derive(Clone)]
pub struct Verifier {
    key: Arc<DecodingKey>,
    issuer: Option<String>,
    audience: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawHeader {
    alg: String,
}

impl Verifier {
    pub fn from_pem(public_key_pem: &[u8]) -> Result<Self, LicenseError> {
        let key = DecodingKey::from_rsa_pem(public_key_pem).map_err(LicenseError::KeyParse)?;
        Ok(Self {
            key: Arc::new(key),
            issuer: None,
            audience: None,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LicenseError> {
        let path = path.as_ref();
        let pem = std::fs::read(path).map_err(|source| LicenseError::KeyRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_pem(&pem)
    }

    /// Require the registered `iss` claim to match.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Require the registered `aud` claim to contain this audience.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn verify(&self, token: &str) -> Result<License, LicenseError> {
        // The header is untrusted; refuse anything outside the RSA family
        // before the key is ever involved.
        if let Some(alg) = raw_header_algorithm(token) {
            if !is_accepted_algorithm(&alg) {
                debug!(
                    target: "arc-licensing::verifier",
                    alg = %alg,
                    "rejecting license token with non-RSA signing method"
                );
                return Err(LicenseError::UnexpectedSigningMethod(alg));
            }
        }

        // A header that does not parse is rejected before decode, whose JSON
        // errors then only ever come from the verified payload.
        decode_header(token).map_err(LicenseError::InvalidToken)?;

        let data = decode::<LicenseClaims>(token, &self.key, &self.validation()).map_err(
            |err| match err.kind() {
                ErrorKind::ExpiredSignature => LicenseError::Expired,
                ErrorKind::Json(inner) => {
                    error!(
                        target: "arc-licensing::verifier",
                        error = %inner,
                        "license token signature verified but payload does not match the license schema"
                    );
                    LicenseError::InvalidClaims(inner.to_string())
                }
                _ => LicenseError::InvalidToken(err),
            },
        )?;

        Ok(data.claims.license)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        // Perpetual licenses carry no `exp`.
        validation.required_spec_claims = HashSet::new();
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = self.audience.is_some();
        if let Some(audience) = &self.audience {
            validation.set_audience(&[audience]);
            validation.required_spec_claims.insert("aud".to_string());
        }
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
            validation.required_spec_claims.insert("iss".to_string());
        }
        validation
    }
}

fn raw_header_algorithm(token: &str) -> Option<String> {
    let segment = token.split('.').next()?;
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    let header: RawHeader = serde_json::from_slice(&bytes).ok()?;
    Some(header.alg)
}

fn is_accepted_algorithm(alg: &str) -> bool {
    alg.parse::<Algorithm>()
        .map(|parsed| ACCEPTED_ALGORITHMS.contains(&parsed))
        .unwrap_or(false)
}
