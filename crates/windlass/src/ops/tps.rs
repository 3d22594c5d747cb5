use serde::{Deserialize, Serialize};

use crate::{context::AgentContext, errors::OpError};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkTpsRequest {
    /// Number of recent performance samples to aggregate. Defaults to 1.
    #[serde(default)]
    pub sample_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkTpsSample {
    pub transactions_per_second: f64,
    pub total_transactions: u64,
    pub sampling_period_seconds: u16,
    pub slot: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkTpsResponse {
    /// TPS of the most recent sample.
    pub current_tps: f64,
    pub samples: Vec<NetworkTpsSample>,
}

/// Read-only and idempotent for a given cluster state.
pub async fn run(ctx: &AgentContext, req: NetworkTpsRequest) -> Result<NetworkTpsResponse, OpError> {
    let count = req.sample_count.unwrap_or(1);
    if count == 0 || count > 720 {
        return Err(OpError::invalid("sample_count must be in 1..=720"));
    }

    let raw = ctx
        .rpc()
        .get_recent_performance_samples(count)
        .await
        .map_err(OpError::from_rpc_read)?;

    let mut samples = Vec::with_capacity(raw.len());
    for s in raw {
        if s.num_transactions == 0 || s.sample_period_secs == 0 {
            continue;
        }
        #[expect(clippy::cast_precision_loss, reason = "tps is a display statistic")]
        let tps = s.num_transactions as f64 / f64::from(s.sample_period_secs);
        samples.push(NetworkTpsSample {
            transactions_per_second: tps,
            total_transactions: s.num_transactions,
            sampling_period_seconds: s.sample_period_secs,
            slot: s.slot,
        });
    }

    let current_tps = samples
        .first()
        .map(|s| s.transactions_per_second)
        .ok_or_else(|| OpError::Protocol("no valid performance samples available".into()))?;

    Ok(NetworkTpsResponse {
        current_tps,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_count_is_optional() -> Result<(), serde_json::Error> {
        let req: NetworkTpsRequest = serde_json::from_value(serde_json::json!({}))?;
        assert!(req.sample_count.is_none());
        Ok(())
    }
}
