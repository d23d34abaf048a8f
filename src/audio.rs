//! Audio backend: the `AudioEngine` capability the player drives, and its
//! `rodio` implementation.

mod engine;
mod output;
mod sink;

#[cfg(test)]
pub mod fake;

pub use engine::AudioEngine;
pub use output::RodioEngine;
