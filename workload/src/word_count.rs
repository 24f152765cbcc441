//! A MapReduce-compatible application that counts how often each word
//! appears across the input files.

use anyhow::{anyhow, Result};

use common::{KeyValue, MapOutput};

/// Emit `(word, "1")` for every word in the input, lowercased, split on
/// non-alphanumeric boundaries.
pub fn map(kv: KeyValue, _aux: &[String]) -> MapOutput {
    let words: Vec<String> = kv
        .value
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();

    let iter = words
        .into_iter()
        .map(|word| Ok(KeyValue::new(word, "1")));
    Ok(Box::new(iter))
}

/// Sum the per-word counts.
pub fn reduce(
    key: String,
    values: Box<dyn Iterator<Item = String> + '_>,
    _aux: &[String],
) -> Result<String> {
    let mut count = 0u64;
    for value in values {
        count += value
            .parse::<u64>()
            .map_err(|e| anyhow!("bad count for key `{}`: {}", key, e))?;
    }
    Ok(count.to_string())
}
