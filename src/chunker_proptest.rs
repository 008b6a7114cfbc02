//! Property-based tests for the argument chunker.

use proptest::prelude::*;

use crate::chunker::chunk;

fn serialized_length(template: &str, files: &[String]) -> usize {
    template.len() + files.iter().map(|f| f.len() + 1).sum::<usize>()
}

proptest! {
    /// No chunk exceeds the limit unless it is a flagged lone oversized path.
    #[test]
    fn chunks_never_exceed_limit(
        template in "[a-z- ]{1,40}",
        files in proptest::collection::vec("[a-z0-9_/]{1,60}\\.rs", 0..200),
        limit in 10usize..500,
    ) {
        for (files, oversized) in chunk(&template, &files, limit) {
            if oversized {
                prop_assert_eq!(files.len(), 1);
            } else {
                prop_assert!(serialized_length(&template, &files) <= limit);
            }
        }
    }

    /// Chunking loses no path and keeps input order.
    #[test]
    fn chunking_is_lossless_and_stable(
        template in "[a-z- ]{1,40}",
        files in proptest::collection::vec("[a-z0-9_/]{1,60}\\.rs", 0..200),
        limit in 10usize..500,
    ) {
        let flattened: Vec<String> = chunk(&template, &files, limit)
            .into_iter()
            .flat_map(|(chunk, _)| chunk)
            .collect();
        prop_assert_eq!(flattened, files);
    }

    /// Every chunk is non-empty; empty input produces no chunks.
    #[test]
    fn no_empty_chunks(
        files in proptest::collection::vec("[a-z0-9]{1,30}", 0..100),
        limit in 5usize..200,
    ) {
        let chunks = chunk("cmd", &files, limit);
        if files.is_empty() {
            prop_assert!(chunks.is_empty());
        }
        for (chunk, _) in chunks {
            prop_assert!(!chunk.is_empty());
        }
    }
}
