use std::collections::{BTreeSet, HashSet};

/// Epochs listed remotely but absent from storage, ascending and without duplicates.
pub fn missing_epochs(remote: &[u64], stored: &HashSet<u64>) -> Vec<u64> {
    remote
        .iter()
        .filter(|epoch| !stored.contains(*epoch))
        .copied()
        .collect::<BTreeSet<u64>>()
        .into_iter()
        .collect()
}
