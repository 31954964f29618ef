#![deny(missing_docs)]
#![doc = "Tomographs: simulated experiments, outcome accumulation and constrained point estimation for states and processes."]

pub mod estimator;
pub mod process;
pub mod state;
pub mod view;

pub use estimator::EstimatorMode;
pub use process::ProcessTomograph;
pub use state::StateTomograph;
pub use view::{ObjectKind, TomographyView};

/// Master seed used by tomographs unless overridden, in the spirit of a
/// documented, stable default rather than ambient entropy.
pub const DEFAULT_SEED: u64 = 0x05EE_DD15_7057_A7E5;
