//! ブロック長への切り上げ

/// `n` 以上で最小の `block_size` の倍数を返す
///
/// `n <= align_up(n) < n + block_size` かつ冪等。
/// `block_size` は 0 より大きいこと（設定検証済みの前提）。
#[inline]
pub fn align_up(n: usize, block_size: usize) -> usize {
    debug_assert!(block_size > 0, "block size must be non-zero");
    n.div_ceil(block_size) * block_size
}
