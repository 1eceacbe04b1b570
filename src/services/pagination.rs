use crate::errors::{RpcError, SyncError};
use crate::services::sui_rpc::SuiRpcClient;
use crate::utils::helpers::decode_u64;
use log::info;

/// Lists every epoch key of an exchange-rate table, in the order the node returns them.
///
/// Any failed page discards what was gathered so far: a truncated listing would
/// look like a complete one to the reconciler.
pub async fn list_epochs(
    rpc: &SuiRpcClient,
    exchange_rates_id: &str,
    max_pages: usize,
) -> Result<Vec<u64>, SyncError> {
    let mut epochs = Vec::new();
    let mut cursor: Option<String> = None;

    for page_number in 1..=max_pages {
        let page = rpc
            .dynamic_fields_page(exchange_rates_id, cursor.as_deref())
            .await?
            .ok_or_else(|| SyncError::ReconciliationGap {
                collection_id: exchange_rates_id.to_string(),
                reason: format!("node unreachable while fetching page {}", page_number),
            })?;

        for field in &page.data {
            epochs.push(decode_u64(&field.name.value, "dynamic field epoch")?);
        }

        if !page.has_next_page {
            return Ok(epochs);
        }

        let next = page.next_cursor.ok_or_else(|| {
            RpcError::Protocol(format!(
                "page {} of {} has more entries but no cursor",
                page_number, exchange_rates_id
            ))
        })?;
        info!(
            "ExchangeRatesId: {}, hasNextPage: true, nextCursor: {}",
            exchange_rates_id, next
        );
        cursor = Some(next);
    }

    Err(SyncError::ReconciliationGap {
        collection_id: exchange_rates_id.to_string(),
        reason: format!("listing did not end within {} pages", max_pages),
    })
}
