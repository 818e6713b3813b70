use crate::types::Segment;
use crate::{Error, Result};

/// Splits `text` into `parts` segments of `word_count / parts` words each,
/// the last segment taking the remainder. Segments may be empty when there
/// are fewer words than parts.
pub fn partition(text: &str, parts: usize) -> Result<Vec<Segment>> {
    if parts == 0 {
        return Err(Error::Partition(
            "partition count must be at least 1".to_string(),
        ));
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let chunk = words.len() / parts;

    let segments = (0..parts)
        .map(|k| {
            let start = k * chunk;
            let end = if k + 1 == parts { words.len() } else { start + chunk };
            Segment {
                index: k + 1,
                text: words[start..end].join(" "),
            }
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        "✂️ Split {} words into {} segments of ~{} words",
        words.len(),
        parts,
        chunk
    );

    Ok(segments)
}
