use crate::{
    chain::Candidate,
    pow::{attempt, CancelFlag},
    Block,
};
use rayon::prelude::*;
use tracing::info;

/// Same contract as `chain::mine_block`, with attempts spread over the rayon
/// pool. The first acceptable nonce any worker finds wins; `None` means the
/// search was cancelled.
pub fn mine_block_parallel(
    reference: &Block,
    difficulty: usize,
    cancel: &CancelFlag,
) -> Option<Candidate> {
    let found = (0u64..u64::MAX)
        .into_par_iter()
        .find_map_any(|_| {
            if cancel.is_cancelled() {
                return Some(None);
            }
            attempt(&reference.hash, difficulty).map(Some)
        })
        .flatten()?;

    info!(
        "Mined candidate on block {} with nonce {} and hash {} (parallel)",
        reference.index, found.nonce, found.hash
    );
    Some(Candidate::from_found(reference, difficulty, found))
}
