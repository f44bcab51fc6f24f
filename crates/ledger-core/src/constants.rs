pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const NONCE_SEED_SIZE: usize = 32;
pub const DEFAULT_DIFFICULTY: usize = 4;
/// A hex digest has no more leading zeros than characters.
pub const MAX_DIFFICULTY: usize = HASH_HEX_SIZE;
pub const DEFAULT_MINING_REWARD: i64 = 1;
pub const COIN_NAME: &str = "Reedcoin";
