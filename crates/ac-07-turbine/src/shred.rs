//! Shred encode/decode with Reed-Solomon parity.
//!
//! The block's wire bytes are prefixed with their length, padded to a
//! whole number of equal shards, and split into data shreds. Parity is
//! computed per erasure set of at most [`FEC_SET_DATA`] data shreds, so
//! the GF(2^8) code's 256-shard bound is never approached no matter how
//! large the block. A set reconstructs from any `data_count` of its
//! shreds; the block reconstructs once every set does.

use reed_solomon_erasure::galois_8::ReedSolomon;

use shared_types::{Hash, Shred, ShredKind};

use crate::config::TurbineConfig;
use crate::errors::TurbineError;

/// Data shreds per erasure set.
pub const FEC_SET_DATA: usize = 32;

/// Parity shreds for a set of `data` shreds: 50% overhead, one parity
/// minimum.
pub fn parity_count(data: usize) -> usize {
    (data / 2).max(1)
}

/// One erasure set's position within the shred numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FecSet {
    data_start: usize,
    data_count: usize,
    parity_start: usize,
    parity_count: usize,
}

/// Deterministic set layout for `num_data` data shreds: data indices
/// come first, parity indices follow set by set.
fn fec_layout(num_data: usize) -> Vec<FecSet> {
    let mut sets = Vec::new();
    let mut parity_start = num_data;
    let mut data_start = 0;
    while data_start < num_data {
        let data_count = FEC_SET_DATA.min(num_data - data_start);
        let parity = parity_count(data_count);
        sets.push(FecSet {
            data_start,
            data_count,
            parity_start,
            parity_count: parity,
        });
        data_start += data_count;
        parity_start += parity;
    }
    sets
}

/// Split `bytes` into data + parity shreds for `block_id`.
pub fn shred_block_bytes(
    block_id: Hash,
    bytes: &[u8],
    config: &TurbineConfig,
) -> Result<Vec<Shred>, TurbineError> {
    // Length prefix so reconstruction can strip the padding.
    let mut framed = (bytes.len() as u64).to_le_bytes().to_vec();
    framed.extend_from_slice(bytes);

    let shard_size = config.data_shred_bytes.max(1);
    let num_data = framed.len().div_ceil(shard_size).max(1);
    framed.resize(num_data * shard_size, 0);

    let data_shards: Vec<Vec<u8>> = framed.chunks(shard_size).map(|c| c.to_vec()).collect();
    let sets = fec_layout(num_data);

    let mut parity_shards: Vec<Vec<u8>> = Vec::new();
    for set in &sets {
        let mut shards: Vec<Vec<u8>> =
            data_shards[set.data_start..set.data_start + set.data_count].to_vec();
        shards.extend(std::iter::repeat_with(|| vec![0u8; shard_size]).take(set.parity_count));

        let rs = ReedSolomon::new(set.data_count, set.parity_count)
            .map_err(|e| TurbineError::Erasure(format!("{e:?}")))?;
        rs.encode(&mut shards)
            .map_err(|e| TurbineError::Erasure(format!("{e:?}")))?;
        parity_shards.extend(shards.into_iter().skip(set.data_count));
    }

    let total = (num_data + parity_shards.len()) as u32;
    Ok(data_shards
        .into_iter()
        .map(|payload| (ShredKind::Data, payload))
        .chain(
            parity_shards
                .into_iter()
                .map(|payload| (ShredKind::Parity, payload)),
        )
        .enumerate()
        .map(|(index, (kind, payload))| Shred {
            block_id,
            index: index as u32,
            total,
            num_data: num_data as u32,
            kind,
            payload,
        })
        .collect())
}

/// Rebuild the original block bytes from any sufficient subset of the
/// shred set.
pub fn reconstruct_block_bytes(shreds: &[Shred]) -> Result<Vec<u8>, TurbineError> {
    let first = shreds
        .first()
        .ok_or(TurbineError::Insufficient { have: 0, need: 1 })?;
    let total = first.total as usize;
    let num_data = first.num_data as usize;

    let mut by_index: Vec<Option<&Shred>> = vec![None; total];
    for shred in shreds {
        if shred.total as usize != total || shred.num_data as usize != num_data {
            return Err(TurbineError::InconsistentShreds(
                "mixed shred sets for one block id".to_string(),
            ));
        }
        let index = shred.index as usize;
        if index >= total {
            return Err(TurbineError::InconsistentShreds(format!(
                "shred index {index} out of range {total}"
            )));
        }
        by_index[index] = Some(shred);
    }

    let sets = fec_layout(num_data);
    let expected_total: usize = num_data + sets.iter().map(|s| s.parity_count).sum::<usize>();
    if expected_total != total {
        return Err(TurbineError::InconsistentShreds(format!(
            "advertised total {total} does not fit {num_data} data shreds"
        )));
    }

    let mut framed = Vec::new();
    for set in &sets {
        let mut shards: Vec<Option<Vec<u8>>> = Vec::with_capacity(set.data_count + set.parity_count);
        for i in 0..set.data_count {
            shards.push(by_index[set.data_start + i].map(|s| s.payload.clone()));
        }
        for i in 0..set.parity_count {
            shards.push(by_index[set.parity_start + i].map(|s| s.payload.clone()));
        }

        let have = shards.iter().filter(|s| s.is_some()).count();
        if have < set.data_count {
            return Err(TurbineError::Insufficient {
                have,
                need: set.data_count,
            });
        }

        let rs = ReedSolomon::new(set.data_count, set.parity_count)
            .map_err(|e| TurbineError::Erasure(format!("{e:?}")))?;
        rs.reconstruct(&mut shards)
            .map_err(|e| TurbineError::Erasure(format!("{e:?}")))?;

        for shard in shards.into_iter().take(set.data_count) {
            framed.extend_from_slice(&shard.expect("reconstructed"));
        }
    }

    if framed.len() < 8 {
        return Err(TurbineError::InconsistentShreds("truncated frame".to_string()));
    }
    let len = u64::from_le_bytes(framed[..8].try_into().expect("8 bytes")) as usize;
    if framed.len() < 8 + len {
        return Err(TurbineError::InconsistentShreds(
            "frame shorter than its declared length".to_string(),
        ));
    }
    Ok(framed[8..8 + len].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK_ID: Hash = [7u8; 32];

    fn config() -> TurbineConfig {
        TurbineConfig::default()
    }

    #[test]
    fn test_roundtrip_small_payload() {
        let bytes = b"tiny block".to_vec();
        let shreds = shred_block_bytes(BLOCK_ID, &bytes, &config()).unwrap();
        assert_eq!(reconstruct_block_bytes(&shreds).unwrap(), bytes);
    }

    #[test]
    fn test_roundtrip_large_payload() {
        // A 10 MB block spans hundreds of erasure sets and still
        // reconstructs byte-exactly.
        let bytes: Vec<u8> = (0..10_000_000u32).map(|i| (i % 251) as u8).collect();
        let shreds = shred_block_bytes(BLOCK_ID, &bytes, &config()).unwrap();
        assert!(shreds.len() > 10_000);
        assert_eq!(reconstruct_block_bytes(&shreds).unwrap(), bytes);
    }

    #[test]
    fn test_reconstruct_from_subset_with_parity() {
        let bytes: Vec<u8> = (0..10_000u32).map(|i| (i % 256) as u8).collect();
        let mut shreds = shred_block_bytes(BLOCK_ID, &bytes, &config()).unwrap();
        // 10 data shreds in one set with 5 parity; drop 5 data shreds.
        shreds.drain(..5);
        assert_eq!(reconstruct_block_bytes(&shreds).unwrap(), bytes);
    }

    #[test]
    fn test_loss_across_sets_recovers() {
        // Two full sets; drop a different slice of each.
        let bytes: Vec<u8> = vec![0xCD; 64 * 1_024 - 8];
        let shreds = shred_block_bytes(BLOCK_ID, &bytes, &config()).unwrap();
        assert_eq!(shreds[0].num_data, 64);

        let kept: Vec<Shred> = shreds
            .into_iter()
            // Lose data shreds 0..8 of the first set and 40..48 of the
            // second; parity covers both.
            .filter(|s| !(s.index < 8 || (40..48).contains(&s.index)))
            .collect();
        assert_eq!(reconstruct_block_bytes(&kept).unwrap(), bytes);
    }

    #[test]
    fn test_too_few_shreds_fails() {
        let bytes: Vec<u8> = vec![1u8; 5_000];
        let mut shreds = shred_block_bytes(BLOCK_ID, &bytes, &config()).unwrap();
        let num_data = shreds[0].num_data as usize;
        shreds.truncate(num_data - 1);
        assert!(matches!(
            reconstruct_block_bytes(&shreds),
            Err(TurbineError::Insufficient { .. })
        ));
    }

    #[test]
    fn test_shred_sizes_fixed() {
        let bytes: Vec<u8> = vec![9u8; 3_000];
        let shreds = shred_block_bytes(BLOCK_ID, &bytes, &config()).unwrap();
        for shred in &shreds {
            assert_eq!(shred.size(), 1_024);
            assert_eq!(shred.block_id, BLOCK_ID);
        }
        let data = shreds.iter().filter(|s| s.kind == ShredKind::Data).count();
        let parity = shreds.iter().filter(|s| s.kind == ShredKind::Parity).count();
        assert_eq!(data, 3); // 8-byte prefix pushes 3000 bytes into 3 shards
        assert_eq!(parity, 1);
    }

    #[test]
    fn test_mixed_sets_rejected() {
        let a = shred_block_bytes(BLOCK_ID, &vec![1u8; 5_000], &config()).unwrap();
        let b = shred_block_bytes(BLOCK_ID, &vec![2u8; 50_000], &config()).unwrap();
        let mut mixed = a;
        mixed.extend(b);
        assert!(matches!(
            reconstruct_block_bytes(&mixed),
            Err(TurbineError::InconsistentShreds(_))
        ));
    }

    #[test]
    fn test_fec_layout_partial_last_set() {
        let sets = fec_layout(40);
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].data_count, 32);
        assert_eq!(sets[0].parity_count, 16);
        assert_eq!(sets[1].data_count, 8);
        assert_eq!(sets[1].parity_count, 4);
        assert_eq!(sets[1].parity_start, 40 + 16);
    }
}
