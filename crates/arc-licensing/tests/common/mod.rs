#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};

use arc_licensing::{
    License, LicenseClaims, LicenseLimits, LicenseType, PlanTier, RegisteredClaims, Verifier,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use uuid::Uuid;

pub const ISSUER_PRIVATE_PEM: &[u8] = include_bytes!("../fixtures/issuer_private.pem");
pub const ISSUER_PUBLIC_PEM: &[u8] = include_bytes!("../fixtures/issuer_public.pem");
pub const ROGUE_PRIVATE_PEM: &[u8] = include_bytes!("../fixtures/rogue_private.pem");
pub const EC_PRIVATE_PEM: &[u8] = include_bytes!("../fixtures/ec_private.pem");

pub fn verifier() -> Verifier {
    Verifier::from_pem(ISSUER_PUBLIC_PEM).expect("issuer public key parses")
}

pub fn license(license_type: LicenseType, limits: LicenseLimits) -> License {
    License {
        license_id: Uuid::new_v4(),
        customer_id: Uuid::new_v4(),
        customer_name: "Acme Data Fiduciary".to_string(),
        issuer: "arc-licensing".to_string(),
        issued_at: Utc::now() - Duration::days(1),
        expires_at: Some(Utc::now() + Duration::days(365)),
        license_type,
        plan_tier: PlanTier::Enterprise,
        features: BTreeSet::from(["sso".to_string(), "dsr_automation".to_string()]),
        limits,
        metadata: HashMap::new(),
    }
}

pub fn saas(monthly_api_requests: i64) -> License {
    license(
        LicenseType::Saas,
        LicenseLimits {
            monthly_api_requests,
            ..LicenseLimits::default()
        },
    )
}

pub fn on_prem(max_users: i64) -> License {
    license(
        LicenseType::OnPrem,
        LicenseLimits {
            max_users,
            ..LicenseLimits::default()
        },
    )
}

pub fn expired(mut license: License, ago: Duration) -> License {
    license.expires_at = Some(Utc::now() - ago);
    license
}

pub fn claims(license: License) -> LicenseClaims {
    LicenseClaims {
        registered: RegisteredClaims {
            iss: Some(license.issuer.clone()),
            sub: Some(license.customer_id.to_string()),
            iat: Some(license.issued_at.timestamp()),
            jti: Some(license.license_id.to_string()),
            ..RegisteredClaims::default()
        },
        license,
    }
}

pub fn sign_with<T: Serialize>(payload: &T, alg: Algorithm, key: &EncodingKey) -> String {
    encode(&Header::new(alg), payload, key).expect("token encodes")
}

pub fn rsa_key(pem: &[u8]) -> EncodingKey {
    EncodingKey::from_rsa_pem(pem).expect("rsa private key parses")
}

/// RS256 token from the trusted issuer key.
pub fn issue(license: License) -> String {
    sign_with(&claims(license), Algorithm::RS256, &rsa_key(ISSUER_PRIVATE_PEM))
}

pub fn issue_claims(claims: &LicenseClaims) -> String {
    sign_with(claims, Algorithm::RS256, &rsa_key(ISSUER_PRIVATE_PEM))
}

pub fn with_registered_exp(license: License, exp: DateTime<Utc>) -> LicenseClaims {
    let mut claims = claims(license);
    claims.registered.exp = Some(exp.timestamp());
    claims
}

/// Rewrite the payload segment of a signed token, keeping the original
/// header and signature.
pub fn tamper(token: &str, edit: impl FnOnce(&mut serde_json::Value)) -> String {
    let mut parts = token.split('.');
    let header = parts.next().expect("header segment");
    let payload = parts.next().expect("payload segment");
    let signature = parts.next().expect("signature segment");

    let mut value: serde_json::Value =
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).expect("payload base64"))
            .expect("payload json");
    edit(&mut value);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&value).expect("payload encodes"));
    format!("{header}.{payload}.{signature}")
}

/// Token with an arbitrary header and no meaningful signature.
pub fn forged(header: &serde_json::Value, payload: &serde_json::Value) -> String {
    format!(
        "{}.{}.",
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(header).expect("header encodes")),
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload).expect("payload encodes")),
    )
}
