use std::hash::{BuildHasher, Hasher};

/// 32-bit hash used to order the node-BST and both edge-BSTs. Any
/// deterministic 32-bit hash satisfies the storage engine's requirements
/// (spec leaves the choice open); this one wraps google's city-hash so
/// that opening a file with the default hasher never needs an extra
/// dependency beyond what this crate already pulls in for other reasons.
#[derive(Clone, Copy, Default)]
pub struct CityHasher32 {
    digest: u128,
}

impl CityHasher32 {
    pub fn new() -> CityHasher32 {
        CityHasher32::default()
    }
}

impl BuildHasher for CityHasher32 {
    type Hasher = Self;

    #[inline]
    fn build_hasher(&self) -> Self {
        *self
    }
}

impl Hasher for CityHasher32 {
    fn finish(&self) -> u64 {
        let folded = ((self.digest >> 64) as u64) ^ ((self.digest & 0xFFFF_FFFF_FFFF_FFFF) as u64);
        folded
    }

    fn write(&mut self, bytes: &[u8]) {
        self.digest = cityhash_rs::cityhash_110_128(bytes);
    }
}

/// Hash a byte string down to the 32-bit value stored in node/edge records.
/// The sentinel hash `2^31` is reserved (see [crate::file::SENTINEL_HASH])
/// and is vanishingly unlikely to collide with a real digest, but callers
/// that construct keys adversarially should not rely on that.
pub fn hash32(bytes: &[u8]) -> u32 {
    let mut h = CityHasher32::new();
    h.write(bytes);
    let folded = h.finish();
    ((folded >> 32) as u32) ^ (folded as u32)
}

/// Derive the 32-bit edge hash from the endpoints' node hashes and the
/// edge's type discriminant: `H(src.hash || "_" || type || "_" || tgt.hash)`.
pub fn edge_hash(src_hash: u32, edge_type: i64, tgt_hash: u32) -> u32 {
    let s = format!("{}_{}_{}", src_hash, edge_type, tgt_hash);
    hash32(s.as_bytes())
}
