use podcast_core::ids::{ChunkId, IdGenerator, PaperId};
use podcast_core::types::Chunk;

/// Word-boundary windowing over `body`: `chunk_words`-sized windows with
/// `overlap_words` of overlap between consecutive windows, strictly
/// increasing ordinals. A final window shorter than `min_chunk_words` is
/// merged into its predecessor rather than emitted as a sub-minimum chunk.
pub fn chunk_body(
    paper_id: PaperId,
    body: &str,
    chunk_words: usize,
    overlap_words: usize,
    min_chunk_words: usize,
    id_gen: &dyn IdGenerator,
) -> Vec<Chunk> {
    let words: Vec<&str> = body.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let stride = chunk_words.saturating_sub(overlap_words).max(1);
    let mut windows = Vec::new();
    let mut start = 0usize;
    while start < words.len() {
        let end = (start + chunk_words).min(words.len());
        windows.push((start, end));
        if end == words.len() {
            break;
        }
        start += stride;
    }

    if windows.len() > 1 {
        let (last_start, last_end) = *windows.last().unwrap();
        if last_end - last_start < min_chunk_words {
            windows.pop();
            let (prev_start, _) = *windows.last().unwrap();
            windows.pop();
            windows.push((prev_start, last_end));
        }
    }

    windows
        .into_iter()
        .enumerate()
        .map(|(ordinal, (start, end))| Chunk {
            chunk_id: ChunkId::from_generator(id_gen),
            paper_id,
            ordinal: ordinal as u32,
            text: words[start..end].join(" "),
            embedding: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use podcast_core::ids::SequentialIdGen;

    fn body_of(word_count: usize) -> String {
        (0..word_count)
            .map(|i| format!("word{i}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn chunks_have_strictly_increasing_ordinals() {
        let r#gen = SequentialIdGen::new();
        let chunks = chunk_body(PaperId::new(), &body_of(1000), 300, 100, 50, &r#gen);
        for pair in chunks.windows(2) {
            assert!(pair[1].ordinal > pair[0].ordinal);
        }
    }

    #[test]
    fn no_chunk_is_shorter_than_the_minimum() {
        let r#gen = SequentialIdGen::new();
        let chunks = chunk_body(PaperId::new(), &body_of(620), 300, 100, 50, &r#gen);
        for chunk in &chunks {
            let words = chunk.text.split_whitespace().count();
            assert!(words >= 50, "chunk has {words} words");
        }
    }

    #[test]
    fn single_short_body_is_one_chunk() {
        let r#gen = SequentialIdGen::new();
        let chunks = chunk_body(PaperId::new(), &body_of(40), 300, 100, 50, &r#gen);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn empty_body_produces_no_chunks() {
        let r#gen = SequentialIdGen::new();
        let chunks = chunk_body(PaperId::new(), "", 300, 100, 50, &r#gen);
        assert!(chunks.is_empty());
    }

    #[quickcheck_macros::quickcheck]
    fn ordinals_always_strictly_increase(word_count: u16) -> bool {
        let r#gen = SequentialIdGen::new();
        let chunks = chunk_body(PaperId::new(), &body_of(word_count as usize), 300, 100, 50, &r#gen);
        chunks.windows(2).all(|pair| pair[1].ordinal > pair[0].ordinal)
    }
}
