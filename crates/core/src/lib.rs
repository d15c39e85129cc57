//! Core library for the musical automaton rig.
//!
//! Rhythms are ordered lists of note events with a cursor. A
//! [`RhythmBank`] keeps the rhythms the rig knows about and picks one by
//! pitch, by index or at random. The [`PlaybackEngine`] is polled from the
//! control loop and, whenever the current note is due, strikes the bell tuned
//! closest to it, drives the woodpeckers and flashes the light groups.
//!
//! Actuators and light strips are reached through the traits in
//! [`mechanism`]; the [`sim`] module provides software versions of them.

pub mod analysis;
pub mod bank;
pub mod bounded;
pub mod config;
pub mod error;
pub mod mechanism;
pub mod playback;
pub mod rhythm;
pub mod sim;
pub mod timing;

pub use analysis::{PitchEstimate, PitchTracker};
pub use bank::RhythmBank;
pub use bounded::BoundedVec;
pub use config::{AppConfig, CatalogConfig, EngineConfig, Rgb, RigConfig};
pub use error::{Result, RigError};
pub use mechanism::{
    shared, BellMechanism, LightGroup, PeckerMechanism, SharedBell, SharedLights, SharedPecker,
};
pub use playback::{FireReport, PlaybackEngine, Tick};
pub use rhythm::{Note, NoteType, Rhythm, RhythmHandle, UNPITCHED_FREQUENCY};
pub use sim::{SimulatedBell, SimulatedLights, SimulatedPecker, SimulatedRig};
pub use timing::{ElapsedMillis, ManualTimeSource, SystemTimeSource, TimeSource};
