//! A MapReduce-compatible application that finds, for every word prefix,
//! the most frequent full word carrying that prefix.

use std::collections::HashMap;

use anyhow::{anyhow, Result};

use common::{KeyValue, MapOutput};

/// Emit `(prefix, word)` for every non-empty prefix of every word.
pub fn map(kv: KeyValue, _aux: &[String]) -> MapOutput {
    let words: Vec<String> = kv
        .value
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();

    let iter = words.into_iter().flat_map(|word| {
        let prefixes: Vec<KeyValue> = word
            .char_indices()
            .map(|(i, c)| {
                let end = i + c.len_utf8();
                KeyValue::new(&word[..end], word.clone())
            })
            .collect();
        prefixes.into_iter().map(Ok)
    });
    Ok(Box::new(iter))
}

/// Pick the most frequent value for the key.
pub fn reduce(
    key: String,
    values: Box<dyn Iterator<Item = String> + '_>,
    _aux: &[String],
) -> Result<String> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(value, _)| value)
        .ok_or_else(|| anyhow!("no values collected for key `{}`", key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_emits_every_prefix() {
        let pairs: Vec<KeyValue> = map(KeyValue::new("input.txt", "cat"), &[])
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(
            pairs,
            vec![
                KeyValue::new("c", "cat"),
                KeyValue::new("ca", "cat"),
                KeyValue::new("cat", "cat"),
            ]
        );
    }

    #[test]
    fn reduce_picks_most_frequent_word() {
        let values: Vec<String> = vec!["car".into(), "cat".into(), "cat".into()];
        let winner = reduce("ca".into(), Box::new(values.into_iter()), &[]).unwrap();
        assert_eq!(winner, "cat");
    }
}
