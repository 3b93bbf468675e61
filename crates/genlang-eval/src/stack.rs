//! Native stack headroom for recursive evaluation.
//!
//! Script recursion is bounded by the call-depth budget, but each script
//! call costs several native frames. Growing the stack on demand keeps a
//! deep but in-budget script from overflowing the host thread.

/// Run `f`, first moving to a fresh stack segment if less than the red
/// zone remains.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    /// Headroom required before recursing further (128KB).
    const RED_ZONE: usize = 128 * 1024;

    /// Size of each new stack segment (2MB).
    const STACK_PER_RECURSION: usize = 2 * 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM manages its own stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
