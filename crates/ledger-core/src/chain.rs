use super::*;
use crate::constants::COIN_NAME;
use crate::pow::{self, CancelFlag, Found};
use tracing::{info, warn};

/// Result of a successful seal: a confirmation plus the new block's fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealResult {
    pub message: String,
    #[serde(flatten)]
    pub block: Block,
}

/// A mined nonce/hash pair for a reference block, not yet in the chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub reference_index: u64,
    /// Hash of the reference block; pass it back to `seal_block`.
    pub previous_hash: String,
    pub nonce: String,
    pub hash: String,
    pub difficulty: usize,
}

impl Candidate {
    pub fn from_found(reference: &Block, difficulty: usize, found: Found) -> Self {
        Self {
            reference_index: reference.index,
            previous_hash: reference.hash.clone(),
            nonce: found.nonce,
            hash: found.hash,
            difficulty,
        }
    }
}

/// Mine against `reference` on the calling thread. Touches no ledger state.
pub fn mine_block(reference: &Block, difficulty: usize, cancel: &CancelFlag) -> Option<Candidate> {
    let found = pow::search(&reference.hash, difficulty, cancel)?;
    info!(
        "Mined candidate on block {} with nonce {} and hash {}",
        reference.index, found.nonce, found.hash
    );
    Some(Candidate::from_found(reference, difficulty, found))
}

/// The zero-transaction genesis block: no previous hash, no nonce.
pub fn genesis_block() -> Block {
    Block {
        index: 0,
        timestamp: now_secs(),
        transactions: vec![],
        previous_hash: None,
        nonce: None,
        hash: pow::combine(None, None),
    }
}

/// Append-only chain plus the pending-transaction staging area.
#[derive(Clone, Debug)]
pub struct Ledger {
    pub(crate) chain: Vec<Block>,
    pub(crate) pending: Vec<Transaction>,
    config: LedgerConfig,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    /// Ledger seeded with its genesis block; the chain is never empty.
    pub fn with_config(config: LedgerConfig) -> Self {
        let genesis = genesis_block();
        info!("Created genesis block {}", genesis.hash);
        Self {
            chain: vec![genesis],
            pending: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    /// Index of the tip block.
    pub fn height(&self) -> u64 {
        self.chain.len().saturating_sub(1) as u64
    }

    pub fn last_block(&self) -> Option<&Block> {
        self.chain.last()
    }

    /// Search for a nonce against `target` (or the tip). Never appends;
    /// `None` means the search was cancelled.
    pub fn mine(
        &self,
        target: Option<&Block>,
        difficulty: usize,
        cancel: &CancelFlag,
    ) -> Option<Candidate> {
        let reference = target.or_else(|| self.last_block())?;
        mine_block(reference, difficulty, cancel)
    }

    /// Seal the pending transactions into a new block linked to the tip.
    ///
    /// A supplied `previous_hash` must match the tip's hash; otherwise the
    /// ledger is left unchanged and `StaleTip` is returned. The nonce is not
    /// checked against any difficulty here.
    pub fn seal_block(
        &mut self,
        previous_hash: Option<&str>,
        nonce: Option<String>,
    ) -> Result<SealResult, LedgerError> {
        let tip_hash = self.last_block().map(|b| b.hash.clone());
        if let (Some(given), Some(tip)) = (previous_hash, tip_hash.as_deref()) {
            if given != tip {
                warn!(expected = tip, got = given, "rejecting seal against stale tip");
                return Err(LedgerError::StaleTip {
                    expected: tip.to_string(),
                    got: given.to_string(),
                });
            }
        }

        let hash = pow::combine(tip_hash.as_deref(), nonce.as_deref());
        let block = Block {
            index: self.chain.len() as u64,
            timestamp: now_secs(),
            transactions: std::mem::take(&mut self.pending),
            previous_hash: tip_hash,
            nonce,
            hash,
        };
        info!(
            "Created block {} with {} transactions",
            block.index,
            block.transactions.len()
        );
        self.chain.push(block.clone());

        Ok(SealResult {
            message: format!(
                "New block mined! You have been compensated {} {}",
                self.config.reward, COIN_NAME
            ),
            block,
        })
    }

    /// Seal a mined candidate, first staging the configured reward for
    /// `miner` when given. A candidate mined against an old tip is rejected
    /// before anything is staged.
    pub fn seal_candidate(
        &mut self,
        candidate: Candidate,
        miner: Option<&str>,
    ) -> Result<SealResult, LedgerError> {
        let tip = self.last_block().map(|b| b.hash.as_str()).unwrap_or_default();
        if tip != candidate.previous_hash {
            warn!(
                expected = tip,
                got = %candidate.previous_hash,
                "discarding candidate mined against stale tip"
            );
            return Err(LedgerError::StaleTip {
                expected: tip.to_string(),
                got: candidate.previous_hash,
            });
        }
        if let Some(miner) = miner {
            self.add_reward(miner)?;
        }
        self.seal_block(Some(candidate.previous_hash.as_str()), Some(candidate.nonce))
    }

    /// Walk the chain checking positions and hash linkage.
    pub fn verify_chain(&self) -> Result<(), LedgerError> {
        for (position, block) in self.chain.iter().enumerate() {
            let index = position as u64;
            let expected_previous = position
                .checked_sub(1)
                .map(|prev| self.chain[prev].hash.as_str());
            if block.index != index
                || block.previous_hash.as_deref() != expected_previous
                || block.hash != block.computed_hash()
            {
                return Err(LedgerError::BrokenLink { index });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_block_example() {
        let ledger = Ledger::new();
        let genesis = ledger.last_block().unwrap();
        assert_eq!(ledger.chain().len(), 1);
        assert_eq!(ledger.height(), 0);
        assert!(genesis.is_genesis());
        assert_eq!(genesis.previous_hash, None);
        assert_eq!(genesis.nonce, None);
        assert_eq!(genesis.hash, digest(b""));
        assert!(genesis.transactions.is_empty());
    }

    #[test]
    fn seal_links_to_tip_and_clears_pending() {
        let mut ledger = Ledger::new();
        let genesis_hash = ledger.last_block().unwrap().hash.clone();
        ledger.add_transaction("alice", 5, None).unwrap();
        ledger.add_transaction("bob", 2, Some("alice")).unwrap();

        let sealed = ledger
            .seal_block(Some(genesis_hash.as_str()), Some("feed".to_string()))
            .unwrap();
        assert_eq!(
            sealed.message,
            "New block mined! You have been compensated 1 Reedcoin"
        );
        assert_eq!(sealed.block.index, 1);
        assert_eq!(sealed.block.previous_hash.as_deref(), Some(genesis_hash.as_str()));
        assert_eq!(sealed.block.hash, pow::combine(Some(genesis_hash.as_str()), Some("feed")));
        assert_eq!(sealed.block.transactions.len(), 2);
        assert!(ledger.pending().is_empty());
        assert_eq!(ledger.last_block(), Some(&sealed.block));
    }

    #[test]
    fn seal_without_previous_hash_uses_tip() {
        let mut ledger = Ledger::new();
        let tip = ledger.last_block().unwrap().hash.clone();
        let sealed = ledger.seal_block(None, None).unwrap();
        assert_eq!(sealed.block.previous_hash, Some(tip.clone()));
        assert_eq!(sealed.block.hash, pow::combine(Some(tip.as_str()), None));
        assert!(ledger.verify_chain().is_ok());
    }

    #[test]
    fn seal_against_stale_tip_is_rejected() {
        let mut ledger = Ledger::new();
        let genesis_hash = ledger.last_block().unwrap().hash.clone();
        ledger.seal_block(Some(genesis_hash.as_str()), Some("01".into())).unwrap();
        ledger.add_transaction("carol", 3, None).unwrap();

        let err = ledger
            .seal_block(Some(genesis_hash.as_str()), Some("02".into()))
            .unwrap_err();
        assert!(matches!(err, LedgerError::StaleTip { .. }));
        assert_eq!(ledger.chain().len(), 2);
        assert_eq!(ledger.pending().len(), 1);
    }

    #[test]
    fn mine_does_not_touch_chain() {
        let ledger = Ledger::new();
        let candidate = ledger.mine(None, 1, &CancelFlag::new()).unwrap();
        let genesis = ledger.last_block().unwrap();
        assert_eq!(ledger.chain().len(), 1);
        assert_eq!(candidate.reference_index, 0);
        assert_eq!(candidate.previous_hash, genesis.hash);
        assert!(pow::is_acceptable(&candidate.hash, 1));
        assert_eq!(
            candidate.hash,
            pow::combine(Some(genesis.hash.as_str()), Some(candidate.nonce.as_str()))
        );
    }

    #[test]
    fn mine_against_explicit_target() {
        let mut ledger = Ledger::new();
        let genesis = ledger.last_block().unwrap().clone();
        ledger.seal_block(None, Some("aa".into())).unwrap();
        let candidate = ledger.mine(Some(&genesis), 1, &CancelFlag::new()).unwrap();
        assert_eq!(candidate.reference_index, 0);
        assert_eq!(candidate.previous_hash, genesis.hash);
    }

    #[test]
    fn cancelled_mine_returns_none() {
        let ledger = Ledger::new();
        let cancel = CancelFlag::new();
        cancel.cancel();
        assert!(ledger.mine(None, 4, &cancel).is_none());
    }

    #[test]
    fn seal_candidate_pays_miner() {
        let mut ledger = Ledger::new();
        let candidate = ledger.mine(None, 1, &CancelFlag::new()).unwrap();
        let sealed = ledger.seal_candidate(candidate.clone(), Some("miner")).unwrap();
        assert_eq!(sealed.block.hash, candidate.hash);
        assert_eq!(sealed.block.transactions.len(), 1);
        assert_eq!(ledger.balance_of("miner"), 1);

        let err = ledger.seal_candidate(candidate, Some("miner")).unwrap_err();
        assert!(matches!(err, LedgerError::StaleTip { .. }));
        assert!(ledger.pending().is_empty());
    }

    #[test]
    fn verify_chain_detects_tampering() {
        let mut ledger = Ledger::new();
        for nonce in ["01", "02", "03"] {
            ledger.seal_block(None, Some(nonce.to_string())).unwrap();
        }
        assert!(ledger.verify_chain().is_ok());

        ledger.chain[2].nonce = Some("ff".to_string());
        assert_eq!(
            ledger.verify_chain(),
            Err(LedgerError::BrokenLink { index: 2 })
        );
    }

    #[test]
    fn seal_message_reflects_configured_reward() {
        let mut ledger = Ledger::with_config(LedgerConfig {
            difficulty: 2,
            reward: 25,
        });
        let sealed = ledger.seal_block(None, None).unwrap();
        assert_eq!(
            sealed.message,
            "New block mined! You have been compensated 25 Reedcoin"
        );
        assert_eq!(ledger.config().difficulty, 2);
    }

    #[test]
    fn seal_result_serializes_flat() {
        let mut ledger = Ledger::new();
        let sealed = ledger.seal_block(None, Some("ab".into())).unwrap();
        let json = serde_json::to_value(&sealed).unwrap();
        assert_eq!(json["index"], 1);
        assert_eq!(json["nonce"], "ab");
        assert!(json["message"].is_string());
        assert!(json.get("block").is_none());
    }
}
