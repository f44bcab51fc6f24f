pub mod book;
pub mod chain;
pub mod constants;
pub mod error;
pub mod mine;
pub mod peers;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub use chain::{Candidate, Ledger, SealResult};
pub use error::LedgerError;
pub use peers::PeerRegistry;

use constants::{DEFAULT_DIFFICULTY, DEFAULT_MINING_REWARD, MAX_DIFFICULTY};

/// Lowercase hex SHA-256 digest of `bytes`. Every hash in the ledger goes
/// through here so block linkage and identities agree on one algorithm.
pub fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Pseudonymous identifier for a raw peer/address string.
pub fn identity_for(raw: &str) -> String {
    digest(raw.as_bytes())
}

/// Seconds since the UNIX epoch.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Ledger-wide knobs the node passes in at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Leading hex zeros a mined hash must carry.
    pub difficulty: usize,
    /// Amount credited to a miner per sealed block.
    pub reward: i64,
}

impl LedgerConfig {
    /// Checked constructor: a difficulty past the digest length could never
    /// be met, and a negative reward would debit the miner.
    pub fn new(difficulty: usize, reward: i64) -> Result<Self, LedgerError> {
        if difficulty > MAX_DIFFICULTY {
            return Err(LedgerError::InvalidConfig(format!(
                "difficulty {difficulty} exceeds the maximum of {MAX_DIFFICULTY}"
            )));
        }
        if reward < 0 {
            return Err(LedgerError::InvalidConfig(format!(
                "reward must be non-negative, got {reward}"
            )));
        }
        Ok(Self { difficulty, reward })
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            reward: DEFAULT_MINING_REWARD,
        }
    }
}

/// Who a transfer comes from. Coinbase/reward transfers have no real sender.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    System,
    Identity(String),
}

impl Sender {
    /// Hash a raw sender address; `None` means a system-originated transfer.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            Some(raw) => Sender::Identity(identity_for(raw)),
            None => Sender::System,
        }
    }

    pub fn is_identity(&self, identity: &str) -> bool {
        matches!(self, Sender::Identity(id) if id == identity)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub from: Sender,
    pub to: String,
    pub amount: i64,
    pub timestamp: u64,
}

impl Transaction {
    pub fn new(from: Sender, to: String, amount: i64) -> Self {
        Self {
            from,
            to,
            amount,
            timestamp: now_secs(),
        }
    }

    pub fn is_coinbase(&self) -> bool {
        self.from == Sender::System
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    pub previous_hash: Option<String>,
    pub nonce: Option<String>,
    pub hash: String,
}

impl Block {
    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    /// Recompute the hash from the stored linkage fields.
    pub fn computed_hash(&self) -> String {
        pow::combine(self.previous_hash.as_deref(), self.nonce.as_deref())
    }
}

pub mod pow {
    use super::constants::{HASH_HEX_SIZE, NONCE_SEED_SIZE};
    use super::digest;
    use rand::RngCore;
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };
    use tracing::debug;

    /// Hash of `previous_hash ++ nonce`. Either side may be absent (genesis).
    pub fn combine(previous_hash: Option<&str>, nonce: Option<&str>) -> String {
        let mut input = String::with_capacity(HASH_HEX_SIZE * 2);
        input.push_str(previous_hash.unwrap_or_default());
        input.push_str(nonce.unwrap_or_default());
        digest(input.as_bytes())
    }

    /// True when `hash` starts with at least `difficulty` `'0'` characters.
    pub fn is_acceptable(hash: &str, difficulty: usize) -> bool {
        hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
    }

    /// Fresh 256-bit nonce: the digest of OS-seeded CSPRNG bytes.
    pub fn random_nonce() -> String {
        let mut seed = [0u8; NONCE_SEED_SIZE];
        rand::thread_rng().fill_bytes(&mut seed);
        digest(&seed)
    }

    /// Shared stop signal for an in-flight search. A child flag also reads
    /// as cancelled once its parent is; links are one level deep.
    #[derive(Clone, Debug, Default)]
    pub struct CancelFlag {
        own: Arc<AtomicBool>,
        parent: Option<Arc<AtomicBool>>,
    }

    impl CancelFlag {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn child(&self) -> Self {
            Self {
                own: Arc::default(),
                parent: Some(self.own.clone()),
            }
        }

        pub fn cancel(&self) {
            self.own.store(true, Ordering::SeqCst);
        }

        pub fn is_cancelled(&self) -> bool {
            self.own.load(Ordering::Relaxed)
                || self
                    .parent
                    .as_ref()
                    .is_some_and(|parent| parent.load(Ordering::Relaxed))
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct Found {
        pub nonce: String,
        pub hash: String,
    }

    /// One attempt against `reference`: a random nonce and its combined hash,
    /// kept only if it meets `difficulty`.
    pub fn attempt(reference: &str, difficulty: usize) -> Option<Found> {
        let nonce = random_nonce();
        let hash = combine(Some(reference), Some(nonce.as_str()));
        is_acceptable(&hash, difficulty).then_some(Found { nonce, hash })
    }

    /// Try random nonces until one combined with `reference` meets
    /// `difficulty`. Unbounded; returns `None` only once `cancel` is set.
    pub fn search(reference: &str, difficulty: usize, cancel: &CancelFlag) -> Option<Found> {
        let mut attempts: u64 = 0;
        loop {
            if cancel.is_cancelled() {
                debug!(attempts, "search cancelled");
                return None;
            }
            attempts += 1;
            if let Some(found) = attempt(reference, difficulty) {
                debug!(attempts, hash = %found.hash, "nonce found");
                return Some(found);
            }
        }
    }
}
