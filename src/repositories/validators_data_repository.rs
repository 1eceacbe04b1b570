use super::decode_epoch;
use crate::errors::StoreError;
use crate::models::ExchangeRateSample;
use futures::TryStreamExt;
use mongodb::bson::{doc, to_document, Document};
use mongodb::options::FindOptions;
use mongodb::{Collection, Database};
use std::collections::HashSet;

const COLLECTION: &str = "validators_data";

fn collection(db: &Database) -> Collection<ExchangeRateSample> {
    db.collection(COLLECTION)
}

/// Upsert that only writes on insert, so an existing (collection, epoch) row
/// matches without being modified and reports no `upserted_id`.
fn sample_insert(sample: &ExchangeRateSample) -> Result<(Document, Document), StoreError> {
    let filter = doc! {
        "exchange_rates_id": &sample.exchange_rates_id,
        "epoch": sample.epoch as i64,
    };
    Ok((filter, doc! { "$setOnInsert": to_document(sample)? }))
}

pub async fn insert_if_absent(db: &Database, sample: &ExchangeRateSample) -> Result<bool, StoreError> {
    let (filter, update) = sample_insert(sample)?;
    let result = collection(db).update_one(filter, update).upsert(true).await?;
    Ok(result.upserted_id.is_some())
}

pub async fn get_epochs(db: &Database, exchange_rates_id: &str) -> Result<HashSet<u64>, StoreError> {
    let epochs = collection(db)
        .distinct("epoch", doc! { "exchange_rates_id": exchange_rates_id })
        .await?;
    epochs
        .into_iter()
        .map(decode_epoch)
        .collect()
}

pub async fn get_samples(
    db: &Database,
    exchange_rates_id: &str,
) -> Result<Vec<ExchangeRateSample>, StoreError> {
    let options = FindOptions::builder().sort(doc! { "epoch": 1 }).build();
    let samples = collection(db)
        .find(doc! { "exchange_rates_id": exchange_rates_id })
        .sort(options.sort.unwrap_or_default())
        .await?
        .try_collect()
        .await?;
    Ok(samples)
}
