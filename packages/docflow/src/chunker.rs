//! Chunker - split an ordered document list into fixed-size groups.

use crate::error::{PipelineError, Result};
use crate::types::document::{Chunk, DocumentRef};

/// Split documents into chunks of at most `chunk_size`, preserving order
/// within and across chunks.
///
/// Produces `ceil(N / chunk_size)` chunks. Pure and deterministic. An empty
/// input or a zero chunk size is an
/// [`InvalidConfiguration`](PipelineError::InvalidConfiguration) error.
pub fn chunk_documents(documents: &[DocumentRef], chunk_size: usize) -> Result<Vec<Chunk>> {
    if chunk_size == 0 {
        return Err(PipelineError::invalid_config("chunk_size must be positive"));
    }
    if documents.is_empty() {
        return Err(PipelineError::invalid_config("no documents to process"));
    }

    Ok(documents
        .chunks(chunk_size)
        .enumerate()
        .map(|(index, window)| Chunk::new(index, window.to_vec()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn docs(n: usize) -> Vec<DocumentRef> {
        (0..n).map(|i| DocumentRef::new(format!("doc_{i}.txt"))).collect()
    }

    #[test]
    fn test_exact_division() {
        let chunks = chunk_documents(&docs(20), 10).unwrap();
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.len() == 10));
    }

    #[test]
    fn test_remainder_chunk() {
        let chunks = chunk_documents(&docs(25), 10).unwrap();
        let sizes: Vec<_> = chunks.iter().map(Chunk::len).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
    }

    #[test]
    fn test_order_preserved() {
        let input = docs(7);
        let chunks = chunk_documents(&input, 3).unwrap();

        let flattened: Vec<_> = chunks
            .iter()
            .flat_map(|c| c.documents.iter().cloned())
            .collect();
        assert_eq!(flattened, input);

        let indices: Vec<_> = chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let err = chunk_documents(&docs(5), 0).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = chunk_documents(&[], 10).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfiguration { .. }));
    }

    proptest! {
        #[test]
        fn prop_concat_reproduces_input(n in 1usize..200, s in 1usize..20) {
            let input = docs(n);
            let chunks = chunk_documents(&input, s).unwrap();

            prop_assert_eq!(chunks.len(), n.div_ceil(s));
            prop_assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= s));

            let flattened: Vec<_> = chunks
                .iter()
                .flat_map(|c| c.documents.iter().cloned())
                .collect();
            prop_assert_eq!(flattened, input);
        }
    }
}
