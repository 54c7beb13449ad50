// Nonce search
//
// One mining pass assembles a tentative body (admitted transactions +
// coinbase) and then grinds nonces until the body's hash carries the
// required leading zeros. The search runs on a blocking thread against
// an owned copy of the body and holds no lock; commit happens back in
// the node under the writer discipline.

use chrono::FixedOffset;
use rand::Rng;

use crate::crypto::hash::satisfies_difficulty;
use crate::primitives::block::{BlockBody, BlockEnvelope};

/// The search starts from a uniform draw over [0, 2^31) and increments
/// with wrapping 64-bit arithmetic, so it cannot overflow even at the
/// top difficulty.
const NONCE_START_SPAN: u64 = 1 << 31;

/// Wall-clock timestamp string in Eastern time (fixed UTC-5 offset).
/// Timestamps are human-facing and not consensus-critical.
pub fn eastern_now() -> String {
    let eastern = FixedOffset::west_opt(5 * 3600).expect("static offset is in range");
    chrono::Utc::now()
        .with_timezone(&eastern)
        .format("%b %d, %Y %H:%M:%S %p ET")
        .to_string()
}

/// Grind nonces until the body hashes under its recorded difficulty,
/// then seal it. CPU-bound and unbounded in time; callers run this via
/// `spawn_blocking` and must not hold any lock across it.
pub fn search(mut body: BlockBody) -> BlockEnvelope {
    let mut nonce: u64 = rand::thread_rng().gen_range(0..NONCE_START_SPAN);
    let mut attempts: u64 = 0;
    loop {
        body.nonce = nonce;
        let digest = body.hash();
        if satisfies_difficulty(&digest, body.difficulty) {
            return BlockEnvelope { block: body, hash: digest };
        }
        nonce = nonce.wrapping_add(1);
        attempts += 1;
        if attempts % 10_000 == 0 {
            std::thread::yield_now();
        }
    }
}
