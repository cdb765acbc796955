use std::{fmt, path::Path, str::FromStr, sync::Arc};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::{
    error::LicenseError,
    license::{License, LicenseLimits, LicenseType},
    verifier::Verifier,
};

/// Rolling monthly metrics enforced for SaaS licenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaasMetric {
    ApiRequests,
    PiiRecords,
}

impl SaasMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaasMetric::ApiRequests => "api_requests",
            SaasMetric::PiiRecords => "pii_records",
        }
    }

    fn limit(&self, limits: &LicenseLimits) -> i64 {
        match self {
            SaasMetric::ApiRequests => limits.monthly_api_requests,
            SaasMetric::PiiRecords => limits.pii_records_processed,
        }
    }
}

/// Point-in-time resource caps enforced for on-prem licenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OnPremMetric {
    Users,
    Domains,
    Cores,
}

impl OnPremMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnPremMetric::Users => "users",
            OnPremMetric::Domains => "domains",
            OnPremMetric::Cores => "cores",
        }
    }

    fn limit(&self, limits: &LicenseLimits) -> i64 {
        match self {
            OnPremMetric::Users => limits.max_users,
            OnPremMetric::Domains => limits.max_domains,
            OnPremMetric::Cores => limits.max_cores,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMetric(pub String);

impl fmt::Display for UnknownMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown license metric '{}'", self.0)
    }
}

impl std::error::Error for UnknownMetric {}

impl FromStr for SaasMetric {
    type Err = UnknownMetric;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "api_requests" => Ok(SaasMetric::ApiRequests),
            "pii_records" => Ok(SaasMetric::PiiRecords),
            other => Err(UnknownMetric(other.to_string())),
        }
    }
}

impl FromStr for OnPremMetric {
    type Err = UnknownMetric;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "users" => Ok(OnPremMetric::Users),
            "domains" => Ok(OnPremMetric::Domains),
            "cores" => Ok(OnPremMetric::Cores),
            other => Err(UnknownMetric(other.to_string())),
        }
    }
}

/// Holds the process's single active license and answers limit checks
/// against it.
///
/// The license is stored as an `Arc` and replaced wholesale, so readers
/// always observe either the previous or the new license in full.
pub struct LicenseManager {
    verifier: Verifier,
    current: RwLock<Option<Arc<License>>>,
}

impl LicenseManager {
    pub fn new(verifier: Verifier) -> Self {
        Self {
            verifier,
            current: RwLock::new(None),
        }
    }

    /// Verify `token` and make it the active license.
    ///
    /// Verification failures and expired licenses leave the previously
    /// active license in place.
    pub fn load_license(&self, token: &str) -> Result<Arc<License>, LicenseError> {
        let license = self.verifier.verify(token.trim())?;

        if license.is_expired() {
            warn!(
                target: "arc-licensing::manager",
                license_id = %license.license_id,
                expires_at = ?license.expires_at,
                "rejecting expired license"
            );
            return Err(LicenseError::Expired);
        }

        let license = Arc::new(license);
        *self.current.write() = Some(license.clone());

        info!(
            target: "arc-licensing::manager",
            license_id = %license.license_id,
            customer = %license.customer_name,
            license_type = license.license_type.as_str(),
            plan_tier = ?license.plan_tier,
            "license activated"
        );
        Ok(license)
    }

    /// Load a token from `path`. A missing file is not an error: the manager
    /// simply stays without a license.
    pub fn load_license_file(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Option<Arc<License>>, LicenseError> {
        let path = path.as_ref();
        let token = match std::fs::read_to_string(path) {
            Ok(token) => token,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    target: "arc-licensing::manager",
                    path = %path.display(),
                    "no license file found; running in restricted mode"
                );
                return Ok(None);
            }
            Err(source) => {
                return Err(LicenseError::LicenseFileRead {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        self.load_license(&token).map(Some)
    }

    pub fn license(&self) -> Result<Arc<License>, LicenseError> {
        self.current.read().clone().ok_or(LicenseError::NoLicense)
    }

    pub fn has_license(&self) -> bool {
        self.current.read().is_some()
    }

    /// Check a SaaS usage count for `metric`. Unknown metric names are not
    /// restricted.
    pub fn check_saas_limit(&self, metric: &str, usage: i64) -> Result<(), LicenseError> {
        match metric.parse::<SaasMetric>() {
            Ok(metric) => self.check_saas(metric, usage),
            Err(unknown) => {
                self.license()?;
                debug!(target: "arc-licensing::manager", %unknown, "no saas limit applies");
                Ok(())
            }
        }
    }

    pub fn check_saas(&self, metric: SaasMetric, usage: i64) -> Result<(), LicenseError> {
        let license = self.license()?;
        if license.license_type != LicenseType::Saas {
            return Ok(());
        }

        let limit = metric.limit(&license.limits);
        if LicenseLimits::exceeded(limit, usage) {
            return Err(LicenseError::LimitExceeded {
                metric: metric.as_str(),
                usage,
                limit,
            });
        }
        Ok(())
    }

    /// Check an on-prem resource count for `metric`. Unknown metric names are
    /// not restricted.
    pub fn check_on_prem_limit(
        &self,
        metric: &str,
        current_count: i64,
    ) -> Result<(), LicenseError> {
        match metric.parse::<OnPremMetric>() {
            Ok(metric) => self.check_on_prem(metric, current_count),
            Err(unknown) => {
                self.license()?;
                debug!(target: "arc-licensing::manager", %unknown, "no on-prem limit applies");
                Ok(())
            }
        }
    }

    pub fn check_on_prem(
        &self,
        metric: OnPremMetric,
        current_count: i64,
    ) -> Result<(), LicenseError> {
        let license = self.license()?;
        if license.license_type != LicenseType::OnPrem {
            return Ok(());
        }

        let limit = metric.limit(&license.limits);
        if LicenseLimits::exceeded(limit, current_count) {
            return Err(LicenseError::LimitExceeded {
                metric: metric.as_str(),
                usage: current_count,
                limit,
            });
        }
        Ok(())
    }
}
