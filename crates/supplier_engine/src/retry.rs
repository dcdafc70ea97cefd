use std::time::Duration;

use supplier_core::PostcodeRecord;
use supplier_logging::{supplier_info, supplier_warn};

use crate::SupplierLookup;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Fixed pause after a failed attempt when another one follows.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// Looks `postcode` up until a supplier name comes back or attempts run out.
///
/// Never fails: lookup errors count as a found-nothing attempt and the last
/// record obtained is returned after the final attempt, sentinels included.
pub async fn lookup_with_retries(
    lookup: &dyn SupplierLookup,
    postcode: &str,
    policy: &RetryPolicy,
) -> PostcodeRecord {
    let attempts = policy.max_attempts.max(1);
    let mut last = PostcodeRecord::not_found(postcode);

    for attempt in 1..=attempts {
        last = match lookup.lookup(postcode).await {
            Ok(record) => record,
            Err(err) => {
                supplier_warn!("[Postcode {}] Attempt {} failed: {}", postcode, attempt, err);
                PostcodeRecord::not_found(postcode)
            }
        };

        if last.is_found() {
            supplier_info!(
                "[Postcode {}] Successful result on attempt {}: {}",
                postcode,
                attempt,
                last.supplier
            );
            return last;
        }

        supplier_info!(
            "[Postcode {}] Attempt {}: Extracted supplier: {}",
            postcode,
            attempt,
            last.supplier
        );

        if attempt < attempts && !policy.delay.is_zero() {
            tokio::time::sleep(policy.delay).await;
        }
    }

    supplier_info!(
        "[Postcode {}] All attempts failed. Last result: {}",
        postcode,
        last.supplier
    );
    last
}
