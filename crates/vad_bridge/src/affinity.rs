//! Best-effort CPU pinning.
//!
//! Thread placement: processors on cores `0..M-1`, receivers on `M..M+N-1`,
//! the bridge publisher after its receivers, all modulo the core count.
//! Pinning is an optimisation only; failure logs a warning and the thread
//! runs unpinned.

/// Pins the calling thread to core `slot % ncores`.
pub fn pin_current_thread(slot: usize) {
    let Some(cores) = core_affinity::get_core_ids() else {
        tracing::warn!(slot, "could not enumerate CPU cores, running unpinned");
        return;
    };
    if cores.is_empty() {
        return;
    }

    let core = cores[slot % cores.len()];
    if !core_affinity::set_for_current(core) {
        tracing::warn!(slot, core = core.id, "failed to pin thread, running unpinned");
    }
}
