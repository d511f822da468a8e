//! Identifier exclusion between upstream records and the store.

use std::collections::HashSet;

use crate::types::Developer;

/// Keep the candidates whose id is not already in `existing`.
///
/// Invalid records are dropped. When upstream repeats an id within the same
/// pass, the first occurrence wins so one batch never carries an id twice.
/// Upstream order is preserved.
pub fn compute_delta<I>(candidates: I, existing: &HashSet<String>) -> Vec<Developer>
where
    I: IntoIterator<Item = Developer>,
{
    let mut seen = HashSet::new();
    let mut delta = Vec::new();

    for dev in candidates {
        if let Err(err) = dev.validate() {
            tracing::warn!(record = ?dev, error = %err, "dropping invalid record");
            continue;
        }
        if existing.contains(&dev.id) {
            continue;
        }
        if !seen.insert(dev.id.clone()) {
            tracing::warn!(id = %dev.id, "dropping repeated upstream id");
            continue;
        }
        delta.push(dev);
    }

    delta
}
