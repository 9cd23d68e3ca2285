use fixtures_api::client::{ApiResult, OracleClient};
use fixtures_api::oracle::{OracleRequest, OracleResponse};
use std::future::Future;

/// Anything that can place a batch of matches onto venues and times.
///
/// Implementations must not overlap two matches at one venue, must keep every
/// match inside operating hours, and must honour each sport's duration. An
/// empty `optimized_matches` list means no feasible placement was found.
pub trait SchedulingOracle: Send + Sync {
    fn optimize(&self, request: &OracleRequest) -> impl Future<Output = ApiResult<OracleResponse>> + Send;
}

impl SchedulingOracle for OracleClient {
    async fn optimize(&self, request: &OracleRequest) -> ApiResult<OracleResponse> {
        OracleClient::optimize(self, request).await
    }
}
