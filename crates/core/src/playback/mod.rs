//! Tick-driven scheduler that turns the notes of a [`Rhythm`] into strikes,
//! motor moves and light flashes.
//!
//! The engine is polled: the host loop calls [`PlaybackEngine::update`] at a
//! short, regular interval and the engine compares the time since the last
//! note against the onset of the next one. Nothing in here blocks.
//!
//! [`Rhythm`]: crate::Rhythm

use std::{fmt, rc::Rc};

use crate::{
    bounded::{nearest_index, BoundedVec},
    config::{EngineConfig, Rgb},
    mechanism::{borrow, borrow_mut, SharedBell, SharedLights, SharedPecker},
    timing::{ElapsedMillis, SystemTimeSource, TimeSource},
    Note, NoteType, RhythmHandle, Result, RigError,
};

/// What a single call to [`PlaybackEngine::update`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// No rhythm is bound.
    Idle,
    /// A rhythm is bound but the current note is not due yet.
    Waiting,
    /// The current note was due and was dispatched.
    Fired(FireReport),
    /// The feedback flash timed out and the lights were turned off.
    FeedbackCleared,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FireReport {
    /// Bell chosen by frequency, if bells are linked.
    pub bell: Option<usize>,
    /// Number of cursor advances during this tick.
    pub advanced: usize,
    /// Strikes refused by busy peckers.
    pub rejected: usize,
    /// The rhythm ran out of notes and the engine went idle.
    pub finished: bool,
}

/// Plays one rhythm at a time on the linked mechanisms.
pub struct PlaybackEngine {
    config: EngineConfig,
    clock: Box<dyn TimeSource>,
    bells: BoundedVec<SharedBell>,
    peckers: BoundedVec<SharedPecker>,
    lights: BoundedVec<SharedLights>,
    bells_active: bool,
    peckers_active: bool,
    rhythm: Option<RhythmHandle>,
    last_onset: ElapsedMillis,
    feedback_lit: bool,
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackEngine {
    /// Creates an engine with default settings on the system clock.
    pub fn new() -> Self {
        Self::with_clock(EngineConfig::default(), SystemTimeSource::new())
    }

    /// Creates an engine with `config` on the system clock.
    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_clock(config, SystemTimeSource::new())
    }

    /// Creates an engine that reads time from `clock`.
    pub fn with_clock(config: EngineConfig, clock: impl TimeSource + 'static) -> Self {
        let capacity = config.mechanism_capacity;
        let last_onset = ElapsedMillis::starting_at(clock.now_millis());
        Self {
            config,
            clock: Box::new(clock),
            bells: BoundedVec::new("bell mechanisms", capacity),
            peckers: BoundedVec::new("pecker mechanisms", capacity),
            lights: BoundedVec::new("light groups", capacity),
            bells_active: false,
            peckers_active: false,
            rhythm: None,
            last_onset,
            feedback_lit: false,
        }
    }

    /// Returns the settings the engine was created with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Adds a bell to the pool searched by frequency.
    pub fn link_bell_mechanism(&mut self, bell: SharedBell) -> Result<()> {
        self.bells
            .push(bell)
            .inspect_err(|err| tracing::warn!(%err, "cannot link bell mechanism"))?;
        self.bells_active = true;
        Ok(())
    }

    /// Adds a pecker. Peckers are offered each due note in link order.
    pub fn link_pecker_mechanism(&mut self, pecker: SharedPecker) -> Result<()> {
        self.peckers
            .push(pecker)
            .inspect_err(|err| tracing::warn!(%err, "cannot link pecker mechanism"))?;
        self.peckers_active = true;
        Ok(())
    }

    /// Adds a light group that flashes whenever a note fires.
    pub fn link_light_group(&mut self, lights: SharedLights) -> Result<()> {
        self.lights
            .push(lights)
            .inspect_err(|err| tracing::warn!(%err, "cannot link light group"))
    }

    /// `true` while a rhythm is bound and still has notes to play.
    pub fn is_active(&self) -> bool {
        self.rhythm.is_some()
    }

    /// Returns the rhythm being played, if any.
    pub fn current_rhythm(&self) -> Option<&RhythmHandle> {
        self.rhythm.as_ref()
    }

    /// Binds `rhythm` and rewinds it to its first note. A rhythm that is
    /// already playing cannot be interrupted.
    pub fn play_rhythm(&mut self, rhythm: RhythmHandle) -> Result<()> {
        if self.rhythm.is_some() {
            tracing::warn!("playback engine is already in playback mode");
            return Err(RigError::AlreadyPlaying);
        }

        {
            let mut bound = borrow_mut(&rhythm, "rhythm")?;
            if bound.is_empty() {
                tracing::warn!("refusing to play a rhythm without notes");
                return Err(RigError::EmptyRhythm);
            }
            if !self.bells_active && !self.peckers_active {
                tracing::warn!("refusing to play without a bell or pecker linked");
                return Err(RigError::NoMechanisms);
            }
            bound.set_current_note(0)?;
            tracing::info!(
                notes = bound.len(),
                median_frequency = bound.median_frequency(),
                "starting rhythm playback"
            );
        }

        self.last_onset.reset(self.clock.now_millis());
        self.rhythm = Some(rhythm);
        Ok(())
    }

    /// Runs one scheduler tick. Mechanism timers are serviced on every call,
    /// playing or not.
    pub fn update(&mut self) -> Result<Tick> {
        for bell in &self.bells {
            borrow_mut(bell, "bell mechanism")?.update();
        }
        for pecker in &self.peckers {
            borrow_mut(pecker, "pecker mechanism")?.update();
        }

        let Some(rhythm) = self.rhythm.clone() else {
            return Ok(Tick::Idle);
        };

        let now = self.clock.now_millis();
        let elapsed = self.last_onset.elapsed(now);
        let onset = borrow(&rhythm, "rhythm")?.onset().unwrap_or(0);

        if elapsed >= onset {
            self.fire(&rhythm, now).map(Tick::Fired)
        } else if elapsed > self.config.flash_window_ms && self.feedback_lit {
            self.wipe_lights(Rgb::BLACK)?;
            self.feedback_lit = false;
            Ok(Tick::FeedbackCleared)
        } else {
            Ok(Tick::Waiting)
        }
    }

    fn fire(&mut self, rhythm: &RhythmHandle, now: u32) -> Result<FireReport> {
        let mut report = FireReport::default();
        if current_note(rhythm)?.is_none() {
            tracing::debug!("cursor is past the last note");
            self.finish();
            report.finished = true;
            return Ok(report);
        }

        self.wipe_lights(self.config.feedback_color)?;
        self.feedback_lit = true;

        if self.bells_active {
            self.dispatch_bell(rhythm, now, &mut report)?;
        }
        if self.peckers_active && self.rhythm.is_some() {
            self.dispatch_peckers(rhythm, now, &mut report)?;
        }
        report.finished = self.rhythm.is_none();
        Ok(report)
    }

    /// Strikes the bell tuned closest to the note, then always advances.
    fn dispatch_bell(
        &mut self,
        rhythm: &RhythmHandle,
        now: u32,
        report: &mut FireReport,
    ) -> Result<()> {
        let Some(note) = current_note(rhythm)? else {
            self.finish();
            return Ok(());
        };

        let frequencies = self
            .bells
            .iter()
            .map(|bell| borrow(bell, "bell mechanism").map(|bell| bell.resonant_frequency()))
            .collect::<Result<Vec<_>>>()?;

        if let Some(index) = nearest_index(frequencies.iter().copied(), note.frequency) {
            tracing::debug!(
                bell = index,
                target = note.frequency,
                resonant = frequencies[index],
                "chose bell with the closest frequency"
            );
            {
                let mut bell = borrow_mut(&self.bells[index], "bell mechanism")?;
                bell.queue_strike(note.velocity, note.length);
                bell.strike();
            }
            report.bell = Some(index);
        }

        self.advance(rhythm, now, report)?;
        Ok(())
    }

    /// Every pecker gets the current note in turn. Motor notes always
    /// advance; strikes only advance when the pecker accepts them.
    fn dispatch_peckers(
        &mut self,
        rhythm: &RhythmHandle,
        now: u32,
        report: &mut FireReport,
    ) -> Result<()> {
        for index in 0..self.peckers.len() {
            let Some(note) = current_note(rhythm)? else {
                break;
            };
            let handle = Rc::clone(&self.peckers[index]);

            let accepted = {
                let mut pecker = borrow_mut(&handle, "pecker mechanism")?;
                if note.note_type == NoteType::Motor {
                    tracing::debug!(pecker = index, length = note.length, "rotating pecker");
                    pecker.rotate(note.length);
                    true
                } else {
                    pecker.queue_strike(note.velocity);
                    pecker.strike()
                }
            };

            if !accepted {
                report.rejected += 1;
                tracing::debug!(pecker = index, "{}", RigError::MechanismBusy);
                continue;
            }
            if !self.advance(rhythm, now, report)? {
                break;
            }
        }
        Ok(())
    }

    /// Moves to the next note and restarts the onset timer. Returns whether
    /// the rhythm still has notes left.
    fn advance(
        &mut self,
        rhythm: &RhythmHandle,
        now: u32,
        report: &mut FireReport,
    ) -> Result<bool> {
        let still_active = {
            let mut rhythm = borrow_mut(rhythm, "rhythm")?;
            rhythm.next_note();
            rhythm.is_active()
        };
        self.last_onset.reset(now);
        report.advanced += 1;
        if !still_active {
            self.finish();
        }
        Ok(still_active)
    }

    fn finish(&mut self) {
        if self.rhythm.take().is_some() {
            tracing::info!("rhythm playback finished");
        }
    }

    fn wipe_lights(&self, color: Rgb) -> Result<()> {
        for (index, group) in self.lights.iter().enumerate() {
            tracing::trace!(group = index, ?color, "wiping light group");
            borrow_mut(group, "light group")?.wipe(color.r, color.g, color.b, 1.0);
        }
        Ok(())
    }
}

fn current_note(rhythm: &RhythmHandle) -> Result<Option<Note>> {
    Ok(borrow(rhythm, "rhythm")?.current_note().copied())
}

impl fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("config", &self.config)
            .field("bells", &self.bells.len())
            .field("peckers", &self.peckers.len())
            .field("lights", &self.lights.len())
            .field("playing", &self.rhythm.is_some())
            .field("last_onset", &self.last_onset)
            .field("feedback_lit", &self.feedback_lit)
            .finish()
    }
}
