pub mod broad_phase;

pub use self::broad_phase::{BroadPhase, BroadPhaseSettings, CandidatePair};
