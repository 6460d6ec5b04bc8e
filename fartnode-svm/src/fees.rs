//! Priority-fee estimation from recent prioritization fees.
//!
//! Samples are scoped to the writable accounts of the transaction being
//! priced. Percentiles use the nearest-rank method over the sorted raw
//! values, a fixed congestion margin is added on top of the chosen
//! percentile, and every value is clamped to the resolved bounds. When
//! sampling fails or yields nothing the clamped fallback is returned.

use fartnode::SolanaCoreConfig;
use serde::{Deserialize, Serialize};
use solana_pubkey::Pubkey;
use std::str::FromStr;

use crate::chain::{Connection, RpcClientLike};

/// Fee used when no samples are available, in micro-lamports per CU.
pub const DEFAULT_PRIORITY_FEE_MICROLAMPORTS: u64 = 5_000;
/// Default lower bound, in micro-lamports per CU.
pub const DEFAULT_MIN_FEE_MICROLAMPORTS: u64 = 0;
/// Default upper bound (1 lamport per CU), in micro-lamports per CU.
pub const DEFAULT_MAX_FEE_MICROLAMPORTS: u64 = 1_000_000;
/// Congestion margin added to the chosen percentile, in percent.
pub const CONGESTION_MARGIN_PERCENT: u64 = 15;

/// Percentile used as the base of the chosen fee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeePercentile {
    /// Median.
    #[serde(rename = "50")]
    P50,
    /// 75th percentile.
    #[default]
    #[serde(rename = "75")]
    P75,
}

/// Where an estimate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeSource {
    /// Computed from recent prioritization fees.
    Rpc,
    /// No samples; the fallback value was used.
    Fallback,
}

/// A priority-fee estimate in micro-lamports per CU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityFeeEstimate {
    /// Clamped median.
    pub p50: u64,
    /// Clamped 75th percentile.
    pub p75: u64,
    /// Chosen fee, margin included and clamped.
    pub chosen: u64,
    /// Where the estimate came from.
    pub source: FeeSource,
}

/// Inclusive fee bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeBounds {
    /// Lower bound.
    pub min: u64,
    /// Upper bound.
    pub max: u64,
}

impl Default for FeeBounds {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_FEE_MICROLAMPORTS,
            max: DEFAULT_MAX_FEE_MICROLAMPORTS,
        }
    }
}

impl FeeBounds {
    /// Bounds from configuration, defaulting each side independently.
    #[must_use]
    pub fn from_config(config: &SolanaCoreConfig) -> Self {
        Self {
            min: config
                .priority_fee_min
                .unwrap_or(DEFAULT_MIN_FEE_MICROLAMPORTS),
            max: config
                .priority_fee_max
                .unwrap_or(DEFAULT_MAX_FEE_MICROLAMPORTS),
        }
    }

    /// Clamps `value` into the bounds. The upper bound wins if the bounds cross.
    #[must_use]
    pub fn clamp(&self, value: u64) -> u64 {
        value.max(self.min).min(self.max)
    }
}

/// Parameters of a single estimate. Unset fields fall back to configuration, then defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorityFeeRequest {
    /// Writable accounts to scope the sample to, as base58 strings.
    pub writable_accounts: Vec<String>,
    /// Base percentile.
    pub percentile: Option<FeePercentile>,
    /// Lower bound override.
    pub min_micro_lamports: Option<u64>,
    /// Upper bound override.
    pub max_micro_lamports: Option<u64>,
    /// Fallback override.
    pub fallback_micro_lamports: Option<u64>,
}

impl PriorityFeeRequest {
    /// A request scoped to `accounts`.
    #[must_use]
    pub fn for_accounts<I, S>(accounts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            writable_accounts: accounts.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Sets the base percentile.
    #[must_use]
    pub const fn with_percentile(mut self, percentile: FeePercentile) -> Self {
        self.percentile = Some(percentile);
        self
    }

    /// Sets explicit bounds.
    #[must_use]
    pub const fn with_bounds(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.min_micro_lamports = min;
        self.max_micro_lamports = max;
        self
    }

    /// Sets the fallback fee.
    #[must_use]
    pub const fn with_fallback(mut self, micro_lamports: u64) -> Self {
        self.fallback_micro_lamports = Some(micro_lamports);
        self
    }

    /// Resolves bounds: explicit values over `configured`.
    #[must_use]
    pub fn bounds(&self, configured: FeeBounds) -> FeeBounds {
        FeeBounds {
            min: self.min_micro_lamports.unwrap_or(configured.min),
            max: self.max_micro_lamports.unwrap_or(configured.max),
        }
    }
}

/// Nearest-rank percentile of an already sorted, non-empty slice.
fn nearest_rank(sorted: &[u64], percentile: FeePercentile) -> u64 {
    let last = sorted.len().saturating_sub(1);
    let index = match percentile {
        FeePercentile::P50 => last / 2,
        FeePercentile::P75 => last * 3 / 4,
    };
    sorted.get(index).or_else(|| sorted.last()).copied().unwrap_or(0)
}

/// Margin rounded half up.
fn congestion_margin(base: u64) -> u64 {
    let margin = (u128::from(base) * u128::from(CONGESTION_MARGIN_PERCENT) + 50) / 100;
    u64::try_from(margin).unwrap_or(u64::MAX)
}

/// Computes an estimate from raw fee samples.
#[must_use]
pub fn estimate_from_samples(
    samples: &[u64],
    percentile: FeePercentile,
    bounds: FeeBounds,
    fallback: u64,
) -> PriorityFeeEstimate {
    if samples.is_empty() {
        let fallback = bounds.clamp(fallback);
        return PriorityFeeEstimate {
            p50: fallback,
            p75: fallback,
            chosen: fallback,
            source: FeeSource::Fallback,
        };
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    let p50 = bounds.clamp(nearest_rank(&sorted, FeePercentile::P50));
    let p75 = bounds.clamp(nearest_rank(&sorted, FeePercentile::P75));
    let base = match percentile {
        FeePercentile::P50 => p50,
        FeePercentile::P75 => p75,
    };
    let chosen = bounds.clamp(base.saturating_add(congestion_margin(base)));
    PriorityFeeEstimate {
        p50,
        p75,
        chosen,
        source: FeeSource::Rpc,
    }
}

/// Parses writable accounts, dropping invalid entries with a warning.
#[must_use]
pub fn parse_writable_accounts(accounts: &[String]) -> Vec<Pubkey> {
    accounts
        .iter()
        .filter_map(|address| match Pubkey::from_str(address) {
            Ok(pubkey) => Some(pubkey),
            Err(_e) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(
                    address = %address,
                    error = %_e,
                    "[fees] skipping invalid writable account"
                );
                None
            }
        })
        .collect()
}

/// Samples recent prioritization fees. Failures yield an empty sample set.
pub async fn sample_recent_fees<C: RpcClientLike>(
    connection: &Connection<C>,
    accounts: &[Pubkey],
) -> Vec<u64> {
    match connection.client.get_recent_prioritization_fees(accounts).await {
        Ok(fees) => fees.into_iter().map(|fee| fee.prioritization_fee).collect(),
        Err(_e) => {
            #[cfg(feature = "telemetry")]
            tracing::warn!(
                endpoint = %connection.endpoint,
                error = %_e,
                "[fees] failed to fetch recent prioritization fees"
            );
            Vec::new()
        }
    }
}

/// Estimates the priority fee for a transaction touching `request.writable_accounts`.
///
/// Never fails: sampling errors degrade to the fallback estimate.
pub async fn estimate_priority_fee<C: RpcClientLike>(
    connection: &Connection<C>,
    request: &PriorityFeeRequest,
    configured: FeeBounds,
) -> PriorityFeeEstimate {
    let percentile = request.percentile.unwrap_or_default();
    let bounds = request.bounds(configured);
    let fallback = request
        .fallback_micro_lamports
        .unwrap_or(DEFAULT_PRIORITY_FEE_MICROLAMPORTS);

    let accounts = parse_writable_accounts(&request.writable_accounts);
    let samples = sample_recent_fees(connection, &accounts).await;
    let estimate = estimate_from_samples(&samples, percentile, bounds, fallback);

    #[cfg(feature = "telemetry")]
    tracing::info!(
        writable_accounts = ?request.writable_accounts,
        percentile = ?percentile,
        min = bounds.min,
        max = bounds.max,
        p50 = estimate.p50,
        p75 = estimate.p75,
        chosen = estimate.chosen,
        source = ?estimate.source,
        fallback,
        "[fees] priority fee estimation"
    );
    estimate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockRpc;
    use fartnode::Commitment;
    use std::sync::Arc;

    fn connection(rpc: MockRpc) -> (Connection<MockRpc>, Arc<MockRpc>) {
        let rpc = Arc::new(rpc);
        (
            Connection::new("https://api.mainnet-beta.solana.com", Commitment::Confirmed, Arc::clone(&rpc)),
            rpc,
        )
    }

    #[test]
    fn percentiles_are_ordered_and_margin_never_lowers_the_base() {
        let estimate =
            estimate_from_samples(&[1500, 500, 750], FeePercentile::P75, FeeBounds::default(), 5_000);
        assert_eq!(estimate.source, FeeSource::Rpc);
        assert!(estimate.p50 >= 500);
        assert!(estimate.p75 >= estimate.p50);
        assert!(estimate.chosen >= estimate.p75);
        // n = 3: p50 index 1, p75 index floor(1.5) = 1
        assert_eq!(estimate.p50, 750);
        assert_eq!(estimate.p75, 750);
        assert_eq!(estimate.chosen, 863);
    }

    #[test]
    fn nearest_rank_indices() {
        let sorted: Vec<u64> = (1..=9).collect();
        assert_eq!(nearest_rank(&sorted, FeePercentile::P50), 5);
        assert_eq!(nearest_rank(&sorted, FeePercentile::P75), 7);
        assert_eq!(nearest_rank(&[42], FeePercentile::P75), 42);
    }

    #[test]
    fn margin_rounds_half_up() {
        assert_eq!(congestion_margin(10), 2);
        assert_eq!(congestion_margin(100), 15);
        assert_eq!(congestion_margin(0), 0);
        assert!(congestion_margin(u64::MAX) < u64::MAX);
    }

    #[test]
    fn chosen_is_clamped_to_bounds() {
        let bounds = FeeBounds { min: 1_000, max: 2_000 };
        let estimate = estimate_from_samples(&[10, 20, 30], FeePercentile::P50, bounds, 0);
        assert_eq!(estimate.p50, 1_000);
        assert_eq!(estimate.chosen, 1_150);

        let estimate = estimate_from_samples(&[9_000_000], FeePercentile::P75, bounds, 0);
        assert_eq!(estimate.chosen, 2_000);
    }

    #[test]
    fn empty_samples_use_clamped_fallback() {
        let estimate = estimate_from_samples(&[], FeePercentile::P75, FeeBounds::default(), 1234);
        assert_eq!(
            estimate,
            PriorityFeeEstimate {
                p50: 1234,
                p75: 1234,
                chosen: 1234,
                source: FeeSource::Fallback,
            }
        );

        let bounds = FeeBounds { min: 0, max: 1_000 };
        let estimate = estimate_from_samples(&[], FeePercentile::P75, bounds, 1234);
        assert_eq!(estimate.chosen, 1_000);
    }

    #[test]
    fn explicit_bounds_override_configured() {
        let configured = FeeBounds { min: 10, max: 20 };
        let request = PriorityFeeRequest::default().with_bounds(None, Some(500));
        assert_eq!(request.bounds(configured), FeeBounds { min: 10, max: 500 });
    }

    #[test]
    fn invalid_accounts_are_dropped() {
        let valid = Pubkey::new_unique();
        let parsed = parse_writable_accounts(&[valid.to_string(), "not-a-key".to_owned()]);
        assert_eq!(parsed, vec![valid]);
    }

    #[tokio::test]
    async fn estimates_from_rpc_samples_scoped_to_accounts() {
        let account = Pubkey::new_unique();
        let (conn, rpc) = connection(MockRpc::new("m").with(|s| s.fees = Ok(vec![500, 750, 1500])));

        let request = PriorityFeeRequest::for_accounts([account.to_string(), "bogus".to_owned()]);
        let estimate = estimate_priority_fee(&conn, &request, FeeBounds::default()).await;

        assert_eq!(estimate.source, FeeSource::Rpc);
        assert_eq!(rpc.state().fee_requests, vec![vec![account]]);
    }

    #[tokio::test]
    async fn sampling_failure_falls_back() {
        let (conn, _rpc) =
            connection(MockRpc::new("m").with(|s| s.fees = Err("node is behind".to_owned())));

        let request = PriorityFeeRequest::default().with_fallback(1234);
        let estimate = estimate_priority_fee(&conn, &request, FeeBounds::default()).await;

        assert_eq!(estimate.chosen, 1234);
        assert_eq!(estimate.source, FeeSource::Fallback);
    }

    #[test]
    fn estimate_serializes_source_lowercase() {
        let estimate = estimate_from_samples(&[], FeePercentile::P50, FeeBounds::default(), 7);
        let json = serde_json::to_value(estimate).unwrap();
        assert_eq!(json["source"], "fallback");
    }
}
