//! Note sequences and their playback cursor.

use std::{cell::RefCell, fmt, rc::Rc};

use crate::{bounded::BoundedVec, config::DEFAULT_MAX_NOTES, Result, RigError};

/// Frequency stored for notes that have no pitch.
pub const UNPITCHED_FREQUENCY: f64 = 20_000.0;

/// Rhythms are shared between the catalog, the engine and whoever authored
/// them.
pub type RhythmHandle = Rc<RefCell<Rhythm>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteType {
    Pitched,
    Dampened,
    Percussive,
    Motor,
}

impl NoteType {
    /// Pitched and dampened notes carry a real frequency.
    pub fn is_tonal(self) -> bool {
        matches!(self, NoteType::Pitched | NoteType::Dampened)
    }
}

impl fmt::Display for NoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NoteType::Pitched => "PITCHED",
            NoteType::Dampened => "DAMPENED",
            NoteType::Percussive => "PERCUSSIVE",
            NoteType::Motor => "MOTOR",
        };
        f.write_str(label)
    }
}

/// A single event inside a [`Rhythm`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    /// Target pitch in Hz, [`UNPITCHED_FREQUENCY`] for non-tonal events.
    pub frequency: f64,
    /// How long the actuator should ring or run, in milliseconds.
    pub length: u32,
    /// Delay after the previous note fired, in milliseconds.
    pub onset: u32,
    /// Perceptually scaled intensity in `[0, 1]`.
    pub velocity: f64,
    pub note_type: NoteType,
    /// Keep the dampener engaged on mechanisms that have one.
    pub damp_hint: bool,
    /// Sub-actuator requested by a motor move.
    pub actuator: Option<u16>,
}

/// Ordered, bounded list of notes plus the playback cursor.
#[derive(Debug, Clone)]
pub struct Rhythm {
    notes: BoundedVec<Note>,
    current: usize,
    active: bool,
    tonal_sum: f64,
    tonal_count: usize,
    median_frequency: f64,
}

impl Default for Rhythm {
    fn default() -> Self {
        Self::new()
    }
}

impl Rhythm {
    /// Creates an empty rhythm holding up to [`DEFAULT_MAX_NOTES`] notes.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_NOTES)
    }

    pub fn with_capacity(max_notes: usize) -> Self {
        Self {
            notes: BoundedVec::new("rhythm notes", max_notes),
            current: 0,
            active: false,
            tonal_sum: 0.0,
            tonal_count: 0,
            median_frequency: 0.0,
        }
    }

    /// Wraps the rhythm in a shareable handle.
    pub fn into_handle(self) -> RhythmHandle {
        Rc::new(RefCell::new(self))
    }

    /// Appends a pitched note that rings for `length` milliseconds.
    pub fn add_note(&mut self, freq: f64, length: u32, onset: u32, velocity: f64) -> Result<()> {
        self.push(Note {
            frequency: freq,
            length,
            onset,
            velocity: scale_velocity(velocity),
            note_type: NoteType::Pitched,
            damp_hint: false,
            actuator: None,
        })
    }

    /// Appends an unpitched strike. Harder strikes hold the striker longer.
    pub fn add_strike(&mut self, onset: u32, velocity: f64) -> Result<()> {
        let velocity = velocity.clamp(0.0, 1.0);
        self.push(Note {
            frequency: UNPITCHED_FREQUENCY,
            length: (20.0 + velocity * 30.0) as u32,
            onset,
            velocity: velocity * velocity,
            note_type: NoteType::Percussive,
            damp_hint: false,
            actuator: None,
        })
    }

    /// Appends a pitched note that is cut short by the dampener.
    pub fn add_dampened_note(&mut self, freq: f64, onset: u32, velocity: f64) -> Result<()> {
        self.push(Note {
            frequency: freq,
            length: 0,
            onset,
            velocity: scale_velocity(velocity),
            note_type: NoteType::Dampened,
            damp_hint: true,
            actuator: None,
        })
    }

    /// Appends a motor move for sub-actuator `which`, running for `length`
    /// milliseconds.
    pub fn add_motor_move(&mut self, which: u16, length: u32, onset: u32) -> Result<()> {
        self.push(Note {
            frequency: UNPITCHED_FREQUENCY,
            length,
            onset,
            velocity: 1.0,
            note_type: NoteType::Motor,
            damp_hint: false,
            actuator: Some(which),
        })
    }

    fn push(&mut self, note: Note) -> Result<()> {
        self.notes.push(note)?;
        if note.note_type.is_tonal() {
            self.tonal_sum += note.frequency;
            self.tonal_count += 1;
            self.median_frequency = self.tonal_sum / self.tonal_count as f64;
        }
        Ok(())
    }

    /// Moves the cursor forward. Stepping past the last note rewinds to the
    /// first one and marks the rhythm inactive.
    pub fn next_note(&mut self) {
        self.current += 1;
        if self.current >= self.notes.len() {
            self.current = 0;
            self.active = false;
            tracing::debug!("no more notes in this rhythm, deactivating");
        } else {
            self.active = true;
            tracing::debug!(current = self.current, "advanced to next note");
        }
    }

    /// Moves the cursor to `index`. The rhythm is active again unless the
    /// cursor sits past the last note.
    pub fn set_current_note(&mut self, index: usize) -> Result<()> {
        if index > self.notes.len() {
            return Err(RigError::OutOfRange {
                index,
                len: self.notes.len(),
            });
        }
        self.current = index;
        self.active = index < self.notes.len();
        Ok(())
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.notes.capacity()
    }

    /// Mean frequency of the pitched and dampened notes, `0.0` when there
    /// are none. Unpitched notes do not take part.
    pub fn median_frequency(&self) -> f64 {
        self.median_frequency
    }

    pub fn note(&self, index: usize) -> Option<&Note> {
        self.notes.get(index)
    }

    pub fn notes(&self) -> &[Note] {
        self.notes.as_slice()
    }

    /// Returns the note under the cursor, `None` once it sits past the end.
    pub fn current_note(&self) -> Option<&Note> {
        self.notes.get(self.current)
    }

    pub fn frequency(&self) -> Option<f64> {
        self.current_note().map(|note| note.frequency)
    }

    pub fn length(&self) -> Option<u32> {
        self.current_note().map(|note| note.length)
    }

    pub fn onset(&self) -> Option<u32> {
        self.current_note().map(|note| note.onset)
    }

    pub fn velocity(&self) -> Option<f64> {
        self.current_note().map(|note| note.velocity)
    }

    pub fn note_type(&self) -> Option<NoteType> {
        self.current_note().map(|note| note.note_type)
    }

    pub fn damp_hint(&self) -> Option<bool> {
        self.current_note().map(|note| note.damp_hint)
    }
}

impl fmt::Display for Rhythm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, note) in self.notes.iter().enumerate() {
            writeln!(
                f,
                "Note #{index} freq/length/onset/vel/type\t{:.2} / {} / {} / {:.2} / {}",
                note.frequency, note.length, note.onset, note.velocity, note.note_type
            )?;
        }
        Ok(())
    }
}

fn scale_velocity(velocity: f64) -> f64 {
    let velocity = velocity.clamp(0.0, 1.0);
    velocity * velocity
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed_rhythm() -> Rhythm {
        let mut rhythm = Rhythm::new();
        rhythm.add_note(440.0, 300, 0, 0.5).unwrap();
        rhythm.add_strike(120, 1.0).unwrap();
        rhythm.add_dampened_note(660.0, 80, 0.8).unwrap();
        rhythm.add_motor_move(2, 500, 200).unwrap();
        rhythm
    }

    #[test]
    fn appends_grow_by_one_and_are_readable() {
        let mut rhythm = Rhythm::new();

        rhythm.add_note(440.0, 300, 0, 0.5).unwrap();
        assert_eq!(rhythm.len(), 1);
        let note = rhythm.note(0).unwrap();
        assert_eq!(note.note_type, NoteType::Pitched);
        assert_eq!(note.length, 300);
        assert!((note.velocity - 0.25).abs() < 1e-12);

        rhythm.add_strike(120, 1.0).unwrap();
        assert_eq!(rhythm.len(), 2);
        let note = rhythm.note(1).unwrap();
        assert_eq!(note.note_type, NoteType::Percussive);
        assert_eq!(note.length, 50);
        assert_eq!(note.frequency, UNPITCHED_FREQUENCY);

        rhythm.add_dampened_note(660.0, 80, 0.8).unwrap();
        assert_eq!(rhythm.len(), 3);
        let note = rhythm.note(2).unwrap();
        assert_eq!(note.note_type, NoteType::Dampened);
        assert_eq!(note.length, 0);

        rhythm.add_motor_move(2, 500, 200).unwrap();
        assert_eq!(rhythm.len(), 4);
        let note = rhythm.note(3).unwrap();
        assert_eq!(note.note_type, NoteType::Motor);
        assert_eq!(note.velocity, 1.0);
        assert_eq!(note.actuator, Some(2));
    }

    #[test]
    fn strike_length_follows_velocity() {
        let mut rhythm = Rhythm::new();
        rhythm.add_strike(0, 0.0).unwrap();
        rhythm.add_strike(0, 0.5).unwrap();
        assert_eq!(rhythm.note(0).unwrap().length, 20);
        assert_eq!(rhythm.note(1).unwrap().length, 35);
    }

    #[test]
    fn median_ignores_unpitched_notes() {
        let rhythm = mixed_rhythm();
        assert!((rhythm.median_frequency() - 550.0).abs() < 1e-9);
    }

    #[test]
    fn median_is_zero_without_tonal_notes() {
        let mut rhythm = Rhythm::new();
        rhythm.add_strike(0, 0.4).unwrap();
        assert_eq!(rhythm.median_frequency(), 0.0);
    }

    #[test]
    fn wraps_after_note_count_steps() {
        let mut rhythm = mixed_rhythm();
        rhythm.set_current_note(0).unwrap();

        for step in 1..rhythm.len() {
            rhythm.next_note();
            assert_eq!(rhythm.current_index(), step);
            assert!(rhythm.is_active());
        }

        rhythm.next_note();
        assert_eq!(rhythm.current_index(), 0);
        assert!(!rhythm.is_active());
    }

    #[test]
    fn rewinding_reactivates_a_finished_rhythm() {
        let mut rhythm = mixed_rhythm();
        assert!(!rhythm.is_active());

        rhythm.set_current_note(0).unwrap();
        assert!(rhythm.is_active());

        for _ in 0..rhythm.len() {
            rhythm.next_note();
        }
        assert!(!rhythm.is_active());

        rhythm.set_current_note(0).unwrap();
        assert!(rhythm.is_active());
    }

    #[test]
    fn cursor_at_note_count_is_inactive() {
        let mut rhythm = mixed_rhythm();
        rhythm.set_current_note(2).unwrap();
        assert!(rhythm.is_active());

        rhythm.set_current_note(4).unwrap();
        assert!(!rhythm.is_active());
        assert!(rhythm.current_note().is_none());
    }

    #[test]
    fn accessors_follow_cursor() {
        let mut rhythm = mixed_rhythm();
        rhythm.set_current_note(3).unwrap();
        assert_eq!(rhythm.note_type(), Some(NoteType::Motor));
        assert_eq!(rhythm.length(), Some(500));
        assert_eq!(rhythm.onset(), Some(200));
        assert_eq!(rhythm.damp_hint(), Some(false));

        rhythm.set_current_note(2).unwrap();
        assert_eq!(rhythm.frequency(), Some(660.0));
        assert_eq!(rhythm.damp_hint(), Some(true));
    }

    #[test]
    fn cursor_cannot_be_forced_past_the_end() {
        let mut rhythm = mixed_rhythm();
        let err = rhythm.set_current_note(5).unwrap_err();
        assert!(matches!(err, RigError::OutOfRange { index: 5, len: 4 }));
        assert_eq!(rhythm.current_index(), 0);
    }

    #[test]
    fn full_rhythm_rejects_appends() {
        let mut rhythm = Rhythm::with_capacity(1);
        rhythm.add_strike(0, 1.0).unwrap();

        let err = rhythm.add_note(440.0, 100, 50, 1.0).unwrap_err();
        assert!(matches!(err, RigError::CapacityExceeded { capacity: 1, .. }));
        assert_eq!(rhythm.len(), 1);
        assert_eq!(rhythm.median_frequency(), 0.0);
    }

    #[test]
    fn display_lists_every_note() {
        let text = mixed_rhythm().to_string();
        assert_eq!(text.lines().count(), 4);
        assert!(text.contains("Note #3"));
        assert!(text.ends_with("MOTOR\n"));
    }
}
