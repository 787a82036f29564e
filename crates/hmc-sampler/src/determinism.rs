use hmc_core::{derive_substream_seed, RngHandle};

/// Derives the seed driving Monte Carlo step `step`.
///
/// Each step draws momenta and accept/reject uniforms from its own substream,
/// so a run resumed at step `n` consumes exactly the randomness an
/// uninterrupted run would have used from `n` on.
pub fn step_seed(master_seed: u64, step: usize) -> u64 {
    derive_substream_seed(master_seed, step as u64)
}

/// RNG handle for Monte Carlo step `step`.
pub fn step_rng(master_seed: u64, step: usize) -> RngHandle {
    RngHandle::substream(master_seed, step as u64)
}
