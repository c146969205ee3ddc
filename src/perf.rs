//! Chunk compression, optionally parallel.
//!
//! Every block of a segment is compressed independently, so with the
//! `parallel` feature the chunks are handed to Rayon.  Results come back in
//! input order either way, and the first failure aborts the whole batch.

use crate::block::{encode_block, BlockHeader};
use crate::codec::CodecError;

pub fn compress_chunks(chunks: &[&[u8]]) -> Result<Vec<(BlockHeader, Vec<u8>)>, CodecError> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        chunks.par_iter().map(|chunk| encode_block(chunk)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        chunks.iter().map(|chunk| encode_block(chunk)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MAX_CHUNK_SIZE;

    #[test]
    fn keeps_input_order() {
        let a = vec![b'a'; 100];
        let b = vec![b'b'; 7];
        let out = compress_chunks(&[&a, &b]).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].0.decoded_size, 100);
        assert_eq!(out[1].0.decoded_size, 7);
    }

    #[test]
    fn one_bad_chunk_fails_the_batch() {
        let big = vec![0u8; MAX_CHUNK_SIZE + 1];
        assert!(compress_chunks(&[b"ok", &big]).is_err());
    }
}
