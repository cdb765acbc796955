use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LicenseType {
    #[serde(rename = "SAAS")]
    Saas,
    #[serde(rename = "ON_PREM")]
    OnPrem,
}

impl LicenseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseType::Saas => "SAAS",
            LicenseType::OnPrem => "ON_PREM",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanTier {
    Starter,
    Pro,
    Enterprise,
}

/// Quotas carried by a license. Zero always means "no cap".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseLimits {
    // SaaS, per calendar month
    #[serde(default, skip_serializing_if = "is_zero")]
    pub monthly_api_requests: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub pii_records_processed: i64,

    // On-prem, point in time
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_users: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_domains: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_cores: i64,
}

impl LicenseLimits {
    /// Reaching a positive cap counts as exceeding it.
    pub fn exceeded(limit: i64, observed: i64) -> bool {
        limit > 0 && observed >= limit
    }
}

/// Decoded license payload. Only ever built by a successful verification and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub license_id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub issuer: String,
    pub issued_at: DateTime<Utc>,
    /// `None` for perpetual licenses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub license_type: LicenseType,
    pub plan_tier: PlanTier,
    #[serde(default, deserialize_with = "null_as_default")]
    pub features: BTreeSet<String>,
    #[serde(default)]
    pub limits: LicenseLimits,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "HashMap::is_empty"
    )]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl License {
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now > expires_at,
            None => false,
        }
    }

    pub fn is_perpetual(&self) -> bool {
        self.expires_at.is_none()
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }
}

/// Standard JWT registered claims that may accompany the license payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisteredClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

/// Token payload: the license fields and registered claims side by side at
/// the top level of the JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseClaims {
    #[serde(flatten)]
    pub license: License,
    #[serde(flatten)]
    pub registered: RegisteredClaims,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
