//! Cross-crate scenarios for the front-end/engine bridge.

#[cfg(all(test, not(target_arch = "wasm32")))]
mod end_to_end;

#[cfg(all(test, not(target_arch = "wasm32")))]
mod av_handoff;
