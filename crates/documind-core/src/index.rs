//! In-memory vector index over one document's chunks.
//!
//! [`VectorIndex`] is the seam for nearest-neighbor backends. The only
//! backend shipped is [`FlatIndex`], an exact brute-force scan over
//! L2-normalized vectors, which defines the reference semantics:
//!
//! - similarity is cosine (inner product of normalized vectors);
//! - results are ordered by descending score, ties broken by ascending
//!   chunk id;
//! - at most `k` entries are returned, never more than the index holds;
//! - an empty index answers every query with an empty result.
//!
//! Any replacement backend must return the same top-k for documents of a
//! few thousand chunks.
//!
//! [`DocumentIndex`] pairs a backend with the chunks it was built from so
//! returned identifiers can be resolved back to text and provenance.

use std::cmp::Ordering;

use crate::embedding::l2_normalize;
use crate::error::{DocQaError, Result};
use crate::models::Chunk;

/// Nearest-neighbor lookup over embedding vectors keyed by chunk id.
///
/// Implementations are immutable after construction and must be safe to
/// query from many threads at once.
pub trait VectorIndex: Send + Sync {
    /// Dimension shared by every vector in the index (`0` when empty).
    fn dims(&self) -> usize;

    /// Number of vectors stored.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return up to `k` `(chunk_id, score)` pairs, best first.
    ///
    /// # Errors
    ///
    /// - [`DocQaError::Configuration`] if `k == 0`.
    /// - [`DocQaError::DimensionMismatch`] if `vector` does not have
    ///   [`dims`](VectorIndex::dims) entries (non-empty index only).
    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<(usize, f32)>>;
}

/// Exact brute-force cosine index.
///
/// Vectors are normalized once at build time and stored row-major in a
/// single contiguous buffer; row `i` belongs to chunk id `i`.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dims: usize,
    len: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Bulk-build from vectors in chunk id order.
    ///
    /// # Errors
    ///
    /// [`DocQaError::DimensionMismatch`] if any vector's length differs from
    /// the first vector's, or the first vector is empty.
    pub fn build(vectors: &[Vec<f32>]) -> Result<Self> {
        let dims = match vectors.first() {
            Some(first) => first.len(),
            None => {
                return Ok(Self {
                    dims: 0,
                    len: 0,
                    data: Vec::new(),
                })
            }
        };
        if dims == 0 {
            return Err(DocQaError::DimensionMismatch {
                expected: 1,
                actual: 0,
            });
        }

        let mut data = Vec::with_capacity(dims * vectors.len());
        for v in vectors {
            if v.len() != dims {
                return Err(DocQaError::DimensionMismatch {
                    expected: dims,
                    actual: v.len(),
                });
            }
            let start = data.len();
            data.extend_from_slice(v);
            l2_normalize(&mut data[start..]);
        }

        Ok(Self {
            dims,
            len: vectors.len(),
            data,
        })
    }

    fn row(&self, id: usize) -> &[f32] {
        &self.data[id * self.dims..(id + 1) * self.dims]
    }
}

impl VectorIndex for FlatIndex {
    fn dims(&self) -> usize {
        self.dims
    }

    fn len(&self) -> usize {
        self.len
    }

    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if k == 0 {
            return Err(DocQaError::Configuration("k must be > 0".to_string()));
        }
        if self.len == 0 {
            return Ok(Vec::new());
        }
        if vector.len() != self.dims {
            return Err(DocQaError::DimensionMismatch {
                expected: self.dims,
                actual: vector.len(),
            });
        }

        let mut query = vector.to_vec();
        l2_normalize(&mut query);

        let mut scored: Vec<(usize, f32)> = (0..self.len)
            .map(|id| {
                let dot: f32 = self.row(id).iter().zip(&query).map(|(a, b)| a * b).sum();
                (id, dot)
            })
            .collect();

        let k = k.min(scored.len());
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, rank_order);
            scored.truncate(k);
        }
        scored.sort_by(rank_order);
        Ok(scored)
    }
}

/// Descending score, then ascending id.
fn rank_order(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
}

/// A built index together with the chunks it covers.
///
/// Created once per processed document and never mutated afterwards;
/// share it behind an `Arc` and replace it wholesale on re-indexing.
pub struct DocumentIndex {
    chunks: Vec<Chunk>,
    index: Box<dyn VectorIndex>,
}

impl DocumentIndex {
    /// Build an exact [`FlatIndex`] from chunks and their vectors.
    ///
    /// # Errors
    ///
    /// [`DocQaError::DimensionMismatch`] if the counts differ or the vectors
    /// do not share one dimension. No index is produced on failure.
    pub fn build(chunks: Vec<Chunk>, vectors: &[Vec<f32>]) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(DocQaError::DimensionMismatch {
                expected: chunks.len(),
                actual: vectors.len(),
            });
        }
        let index = FlatIndex::build(vectors)?;
        Self::with_backend(chunks, Box::new(index))
    }

    /// Wrap an already-built backend.
    ///
    /// # Errors
    ///
    /// - [`DocQaError::DimensionMismatch`] if the backend size differs from
    ///   the chunk count.
    /// - [`DocQaError::Configuration`] if chunk ids are not dense `0..N-1`.
    pub fn with_backend(chunks: Vec<Chunk>, index: Box<dyn VectorIndex>) -> Result<Self> {
        if chunks.len() != index.len() {
            return Err(DocQaError::DimensionMismatch {
                expected: chunks.len(),
                actual: index.len(),
            });
        }
        if let Some((pos, c)) = chunks.iter().enumerate().find(|(i, c)| c.id != *i) {
            return Err(DocQaError::Configuration(format!(
                "chunk at position {} has id {}; ids must be dense and ordered",
                pos, c.id
            )));
        }
        Ok(Self { chunks, index })
    }

    /// Query the backend for the `k` nearest chunk ids.
    pub fn nearest(&self, vector: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        self.index.query(vector, k)
    }

    pub fn chunk(&self, id: usize) -> Option<&Chunk> {
        self.chunks.get(id)
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.index.dims()
    }
}

impl std::fmt::Debug for DocumentIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentIndex")
            .field("chunks", &self.chunks.len())
            .field("dims", &self.index.dims())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn chunk(id: usize) -> Chunk {
        Chunk {
            id,
            text: format!("chunk {}", id),
            start: id * 10,
            end: id * 10 + 10,
            page: None,
        }
    }

    fn chunks(n: usize) -> Vec<Chunk> {
        (0..n).map(chunk).collect()
    }

    #[test]
    fn test_empty_index_returns_empty() {
        let idx = DocumentIndex::build(Vec::new(), &[]).unwrap();
        assert!(idx.is_empty());
        assert!(idx.nearest(&[1.0, 0.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_ranked_by_cosine() {
        let vectors = vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.7, 0.7],
            vec![-1.0, 0.0],
        ];
        let idx = DocumentIndex::build(chunks(4), &vectors).unwrap();
        let hits = idx.nearest(&[1.0, 0.1], 4).unwrap();
        let ids: Vec<usize> = hits.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![0, 2, 1, 3]);
        assert!((hits[3].1 + 0.995).abs() < 0.01);
    }

    #[test]
    fn test_magnitude_ignored() {
        let vectors = vec![vec![10.0, 0.0], vec![0.1, 0.1]];
        let idx = FlatIndex::build(&vectors).unwrap();
        let hits = idx.query(&[0.5, 0.5], 2).unwrap();
        assert_eq!(hits[0].0, 1);
        assert!((hits[0].1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_ties_break_by_ascending_id() {
        let vectors = vec![
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![2.0, 0.0],
        ];
        let idx = FlatIndex::build(&vectors).unwrap();
        let hits = idx.query(&[1.0, 0.0], 3).unwrap();
        let ids: Vec<usize> = hits.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1, 3, 4]);
    }

    #[test]
    fn test_top_k_bound() {
        let vectors: Vec<Vec<f32>> = (0..10).map(|i| vec![i as f32, 1.0]).collect();
        let idx = FlatIndex::build(&vectors).unwrap();
        assert_eq!(idx.query(&[1.0, 1.0], 3).unwrap().len(), 3);
        assert_eq!(idx.query(&[1.0, 1.0], 50).unwrap().len(), 10);
    }

    #[test]
    fn test_scores_are_cosine_of_raw_vectors() {
        let vectors = vec![vec![0.3, -1.2, 2.5], vec![4.0, 0.0, 0.0], vec![-0.5, 0.5, 0.1]];
        let q = [1.1, 0.4, -0.7];
        let norm = |v: &[f32]| v.iter().map(|x| x * x).sum::<f32>().sqrt();
        let idx = FlatIndex::build(&vectors).unwrap();
        for (id, score) in idx.query(&q, 3).unwrap() {
            let v = &vectors[id];
            let dot: f32 = v.iter().zip(&q).map(|(a, b)| a * b).sum();
            assert!((score - dot / (norm(v) * norm(&q))).abs() < 1e-5);
        }
    }

    #[test]
    fn test_partial_selection_matches_full_sort() {
        let vectors: Vec<Vec<f32>> = (0..200)
            .map(|i| {
                let t = i as f32 * 0.37;
                vec![t.sin(), t.cos(), (t * 0.5).sin()]
            })
            .collect();
        let idx = FlatIndex::build(&vectors).unwrap();
        let q = [0.3, -0.2, 0.9];
        let all = idx.query(&q, 200).unwrap();
        for k in [1, 5, 17, 199] {
            assert_eq!(idx.query(&q, k).unwrap(), all[..k].to_vec());
        }
    }

    #[test]
    fn test_deterministic_rebuild() {
        let vectors = vec![vec![0.2, 0.8], vec![0.8, 0.2], vec![0.2, 0.8]];
        let a = DocumentIndex::build(chunks(3), &vectors).unwrap();
        let b = DocumentIndex::build(chunks(3), &vectors).unwrap();
        assert_eq!(
            a.nearest(&[0.5, 0.5], 3).unwrap(),
            b.nearest(&[0.5, 0.5], 3).unwrap()
        );
    }

    #[test]
    fn test_mixed_dimensions_rejected() {
        let vectors = vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.0]];
        let err = DocumentIndex::build(chunks(2), &vectors).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DimensionMismatch);
    }

    #[test]
    fn test_count_mismatch_rejected() {
        let err = DocumentIndex::build(chunks(3), &[vec![1.0], vec![2.0]]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DimensionMismatch);
    }

    #[test]
    fn test_query_dimension_checked() {
        let idx = FlatIndex::build(&[vec![1.0, 0.0]]).unwrap();
        let err = idx.query(&[1.0, 0.0, 0.0], 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DimensionMismatch);
    }

    #[test]
    fn test_zero_k_rejected() {
        let idx = FlatIndex::build(&[vec![1.0]]).unwrap();
        assert_eq!(idx.query(&[1.0], 0).unwrap_err().kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_non_dense_ids_rejected() {
        let mut cs = chunks(2);
        cs[1].id = 5;
        let err = DocumentIndex::build(cs, &[vec![1.0], vec![2.0]]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_zero_vector_scores_zero() {
        let idx = FlatIndex::build(&[vec![0.0, 0.0], vec![1.0, 0.0]]).unwrap();
        let hits = idx.query(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].0, 1);
        assert_eq!(hits[1], (0, 0.0));
    }
}
