//! Rate-limit advisory
//!
//! The API reports its quota in `x-ratelimit-limit` and
//! `x-ratelimit-remaining`. Nothing is enforced client-side; a warning is
//! logged when less than a tenth of the quota remains.

use log::warn;

use super::transport::RawResponse;

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Quota reported by one response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub limit: u64,
    pub remaining: u64,
}

impl RateLimitStatus {
    /// Read both headers; `None` unless both are present and numeric
    pub fn from_response(response: &RawResponse) -> Option<Self> {
        let parse = |name: &str| {
            response
                .header(name)
                .and_then(|v| v.trim().parse::<u64>().ok())
        };
        Some(Self {
            limit: parse(LIMIT_HEADER)?,
            remaining: parse(REMAINING_HEADER)?,
        })
    }

    /// Remaining capacity is under 10% of the limit
    pub fn is_low(&self) -> bool {
        self.limit > 0 && self.remaining.saturating_mul(10) < self.limit
    }
}

/// Warn if the response shows the quota running low.
///
/// Returns the parsed status for callers that want it.
pub fn check_rate_limit(response: &RawResponse) -> Option<RateLimitStatus> {
    let status = RateLimitStatus::from_response(response)?;
    if status.is_low() {
        warn!(
            "Approaching API rate limit: {} of {} requests remaining",
            status.remaining, status.limit
        );
    }
    Some(status)
}
