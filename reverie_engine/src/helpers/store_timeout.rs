use std::{future::Future, time::Duration};

use log::*;

use crate::market_api::MarketError;

/// Runs a storage call with an upper bound on its duration.
///
/// On timeout the call is abandoned and [`MarketError::StoreTimeout`] is returned. Whether the store applied the change
/// is unknown at that point; callers must not assume either outcome.
pub async fn with_store_timeout<T, E, F>(limit: Duration, call: F) -> Result<T, MarketError>
where
    F: Future<Output = Result<T, E>>,
    MarketError: From<E>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(MarketError::from),
        Err(_) => {
            error!("🗃️ A storage call did not complete within {limit:?}. Its outcome is unknown.");
            Err(MarketError::StoreTimeout(limit))
        },
    }
}
