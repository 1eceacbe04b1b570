use super::decode_epoch;
use crate::errors::StoreError;
use crate::models::ValidatorSnapshot;
use futures::TryStreamExt;
use mongodb::bson::{doc, to_document, Bson, Document};
use mongodb::options::FindOptions;
use mongodb::{Collection, Database};

const COLLECTION: &str = "system_state";

fn collection(db: &Database) -> Collection<ValidatorSnapshot> {
    db.collection(COLLECTION)
}

fn row_key(network: &str, epoch: u64, address: &str) -> Document {
    doc! { "sui_address": address, "network": network, "epoch": epoch as i64 }
}

/// Refreshes identity and economic fields; `apy` and `rate_change` are only
/// initialised on insert so a rerun never clears them.
fn snapshot_upsert(snapshot: &ValidatorSnapshot) -> Result<(Document, Document), StoreError> {
    let filter = row_key(&snapshot.network, snapshot.epoch, &snapshot.sui_address);
    let mut fields = to_document(snapshot)?;
    fields.remove("apy");
    fields.remove("rate_change");
    let update = doc! {
        "$set": fields,
        "$setOnInsert": { "apy": Bson::Null, "rate_change": Bson::Null },
    };
    Ok((filter, update))
}

fn apy_update(network: &str, epoch: u64, address: &str, apy: f64) -> (Document, Document) {
    let mut filter = row_key(network, epoch, address);
    filter.insert("apy", Bson::Null);
    (filter, doc! { "$set": { "apy": apy } })
}

fn rate_change_update(
    network: &str,
    epoch: u64,
    address: &str,
    rate_change: f64,
) -> (Document, Document) {
    let mut filter = row_key(network, epoch, address);
    filter.insert("rate_change", Bson::Null);
    (filter, doc! { "$set": { "rate_change": rate_change } })
}

pub async fn upsert_snapshot(db: &Database, snapshot: &ValidatorSnapshot) -> Result<(), StoreError> {
    let (filter, update) = snapshot_upsert(snapshot)?;
    collection(db).update_one(filter, update).upsert(true).await?;
    Ok(())
}

pub async fn get_latest_epoch(db: &Database, network: &str) -> Result<Option<u64>, StoreError> {
    let options = FindOptions::builder()
        .sort(doc! { "epoch": -1 })
        .limit(1)
        .build();
    let mut cursor = collection(db)
        .find(doc! { "network": network })
        .sort(options.sort.unwrap_or_default())
        .limit(options.limit.unwrap_or(1))
        .await?;
    Ok(cursor.try_next().await?.map(|row| row.epoch))
}

pub async fn set_apy(
    db: &Database,
    network: &str,
    epoch: u64,
    address: &str,
    apy: f64,
) -> Result<bool, StoreError> {
    let (filter, update) = apy_update(network, epoch, address, apy);
    let result = collection(db).update_one(filter, update).await?;
    Ok(result.matched_count > 0)
}

pub async fn count_missing_apy(db: &Database, network: &str, epoch: u64) -> Result<u64, StoreError> {
    let count = collection(db)
        .count_documents(doc! { "network": network, "epoch": epoch as i64, "apy": Bson::Null })
        .await?;
    Ok(count)
}

pub async fn get_epochs_missing_rate_change(
    db: &Database,
    network: &str,
) -> Result<Vec<u64>, StoreError> {
    let values = collection(db)
        .distinct("epoch", doc! { "network": network, "rate_change": Bson::Null })
        .await?;
    let mut epochs = values
        .into_iter()
        .map(decode_epoch)
        .collect::<Result<Vec<_>, _>>()?;
    epochs.sort_unstable();
    Ok(epochs)
}

pub async fn get_epoch_snapshots(
    db: &Database,
    network: &str,
    epoch: u64,
) -> Result<Vec<ValidatorSnapshot>, StoreError> {
    let rows = collection(db)
        .find(doc! { "network": network, "epoch": epoch as i64 })
        .await?
        .try_collect()
        .await?;
    Ok(rows)
}

pub async fn set_rate_change(
    db: &Database,
    network: &str,
    epoch: u64,
    address: &str,
    rate_change: f64,
) -> Result<(), StoreError> {
    let (filter, update) = rate_change_update(network, epoch, address, rate_change);
    collection(db).update_one(filter, update).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::snapshot;

    #[test]
    fn snapshot_upsert_keeps_derived_fields_of_existing_rows() {
        let row = snapshot("mainnet", 12, "0xa", Some(0.05));

        let (filter, update) = snapshot_upsert(&row).unwrap();

        assert_eq!(
            filter,
            doc! { "sui_address": "0xa", "network": "mainnet", "epoch": 12_i64 }
        );
        let set = update.get_document("$set").unwrap();
        assert!(!set.contains_key("apy"));
        assert!(!set.contains_key("rate_change"));
        assert_eq!(set.get_str("sui_address").unwrap(), "0xa");
        assert_eq!(set.get_str("stake").unwrap(), row.stake);
        assert_eq!(
            update.get_document("$setOnInsert").unwrap(),
            &doc! { "apy": Bson::Null, "rate_change": Bson::Null }
        );
    }

    #[test]
    fn apy_is_only_written_to_rows_without_one() {
        let (filter, update) = apy_update("mainnet", 12, "0xa", 0.07);

        assert_eq!(
            filter,
            doc! { "sui_address": "0xa", "network": "mainnet", "epoch": 12_i64, "apy": Bson::Null }
        );
        assert_eq!(update, doc! { "$set": { "apy": 0.07 } });
    }

    #[test]
    fn rate_change_is_only_written_to_rows_without_one() {
        let (filter, update) = rate_change_update("mainnet", 12, "0xa", 0.01);

        assert_eq!(filter.get("rate_change"), Some(&Bson::Null));
        assert!(!filter.contains_key("apy"));
        assert_eq!(update, doc! { "$set": { "rate_change": 0.01 } });
    }
}
