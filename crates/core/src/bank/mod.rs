use std::rc::Rc;

use rand::Rng;

use crate::{
    bounded::{nearest_index, BoundedVec},
    config::DEFAULT_MAX_RHYTHMS,
    mechanism::borrow,
    RhythmHandle, Result, RigError,
};

/// Catalog of rhythms the rig can choose from. The bank only hands out
/// handles, it never edits the rhythms it holds.
#[derive(Debug, Clone)]
pub struct RhythmBank {
    rhythms: BoundedVec<RhythmHandle>,
}

impl Default for RhythmBank {
    fn default() -> Self {
        Self::new()
    }
}

impl RhythmBank {
    /// Creates an empty bank holding up to [`DEFAULT_MAX_RHYTHMS`] rhythms.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_RHYTHMS)
    }

    pub fn with_capacity(max_rhythms: usize) -> Self {
        Self {
            rhythms: BoundedVec::new("rhythm bank", max_rhythms),
        }
    }

    /// Stores a handle to `rhythm`. Fails once the bank is full.
    pub fn add_rhythm(&mut self, rhythm: RhythmHandle) -> Result<()> {
        self.rhythms.push(rhythm)
    }

    pub fn len(&self) -> usize {
        self.rhythms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rhythms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RhythmHandle> {
        self.rhythms.iter()
    }

    /// Rhythm whose median frequency is closest to `freq`. Earlier entries
    /// win ties.
    pub fn rhythm_from_pitch(&self, freq: f64) -> Result<RhythmHandle> {
        let medians = self
            .rhythms
            .iter()
            .map(|rhythm| borrow(rhythm, "rhythm").map(|rhythm| rhythm.median_frequency()))
            .collect::<Result<Vec<_>>>()?;
        let index = nearest_index(medians, freq).ok_or(RigError::NotFound)?;
        tracing::debug!(index, freq, "selected rhythm closest to pitch");
        Ok(Rc::clone(&self.rhythms[index]))
    }

    /// Picks a rhythm at random with the thread-local generator.
    pub fn random_rhythm(&self) -> Result<RhythmHandle> {
        self.random_rhythm_with(&mut rand::thread_rng())
    }

    /// Uniform pick over every stored rhythm using the supplied generator.
    pub fn random_rhythm_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<RhythmHandle> {
        if self.rhythms.is_empty() {
            return Err(RigError::NotFound);
        }
        let index = rng.gen_range(0..self.rhythms.len());
        tracing::debug!(index, "selected random rhythm");
        Ok(Rc::clone(&self.rhythms[index]))
    }

    /// Returns the rhythm stored at `index`.
    pub fn rhythm_by_index(&self, index: usize) -> Result<RhythmHandle> {
        self.rhythms
            .get(index)
            .map(Rc::clone)
            .ok_or(RigError::OutOfRange {
                index,
                len: self.rhythms.len(),
            })
    }

    /// Logs every stored rhythm note by note.
    pub fn describe_all(&self) {
        for (index, rhythm) in self.rhythms.iter().enumerate() {
            let Ok(rhythm) = rhythm.try_borrow() else {
                tracing::warn!(index, "rhythm is being edited, skipping");
                continue;
            };
            tracing::info!(
                index,
                notes = rhythm.len(),
                median_frequency = rhythm.median_frequency(),
                "rhythm\n{rhythm}"
            );
        }
    }
}
