mod common;

use std::sync::Arc;

use arc_licensing::{InMemoryUsageTracker, LicenseError, LicenseManager, UsageTracker};
use common::*;

async fn admit(
    manager: &LicenseManager,
    tracker: &dyn UsageTracker,
    tenant: &str,
) -> Result<i64, LicenseError> {
    let count = tracker.increment_api_request(tenant).await.unwrap();
    manager.check_saas_limit("api_requests", count)?;
    Ok(count)
}

#[tokio::test]
async fn tracker_counts_drive_saas_quota() {
    let manager = LicenseManager::new(verifier());
    manager.load_license(&issue(saas(3))).unwrap();
    let tracker = InMemoryUsageTracker::new();

    assert_eq!(admit(&manager, &tracker, "t1").await.unwrap(), 1);
    assert_eq!(admit(&manager, &tracker, "t1").await.unwrap(), 2);
    assert!(matches!(
        admit(&manager, &tracker, "t1").await,
        Err(LicenseError::LimitExceeded { usage: 3, limit: 3, .. })
    ));

    // Quotas are per tenant.
    assert_eq!(admit(&manager, &tracker, "t2").await.unwrap(), 1);
    assert_eq!(tracker.get_api_request_count("t1").await.unwrap(), 3);
    assert_eq!(tracker.get_api_request_count("t2").await.unwrap(), 1);
}

#[tokio::test]
async fn tracker_is_usable_behind_a_trait_object() {
    let tracker: Arc<dyn UsageTracker> = Arc::new(InMemoryUsageTracker::new());
    assert_eq!(tracker.get_api_request_count("fresh").await.unwrap(), 0);
    for expected in 1..=3 {
        assert_eq!(tracker.increment_api_request("t1").await.unwrap(), expected);
    }
    assert_eq!(tracker.get_api_request_count("t1").await.unwrap(), 3);
}
