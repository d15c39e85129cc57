//! Software stand-ins for the rig's actuators and light strips. They log what
//! real hardware would do and keep just enough state to behave like it.

use std::{cell::RefCell, rc::Rc};

use crate::{
    config::{Rgb, RigConfig},
    mechanism::{shared, BellMechanism, LightGroup, PeckerMechanism},
    timing::{ElapsedMillis, TimeSource},
    PlaybackEngine, Result,
};

/// Bell that rings for the queued length and then dampens itself.
pub struct SimulatedBell<C> {
    name: String,
    frequency: f64,
    clock: C,
    queued: Option<(f64, u32)>,
    ringing: Option<(ElapsedMillis, u32)>,
    strikes: usize,
}

impl<C: TimeSource> SimulatedBell<C> {
    /// Creates a silent bell tuned to `frequency`.
    pub fn new(name: impl Into<String>, frequency: f64, clock: C) -> Self {
        Self {
            name: name.into(),
            frequency,
            clock,
            queued: None,
            ringing: None,
            strikes: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns how many strikes actually rang the bell.
    pub fn strikes(&self) -> usize {
        self.strikes
    }

    pub fn is_ringing(&self) -> bool {
        self.ringing.is_some()
    }
}

impl<C: TimeSource> BellMechanism for SimulatedBell<C> {
    fn resonant_frequency(&self) -> f64 {
        self.frequency
    }

    fn queue_strike(&mut self, velocity: f64, length: u32) {
        self.queued = Some((velocity, length));
    }

    fn strike(&mut self) {
        let Some((velocity, length)) = self.queued.take() else {
            tracing::debug!(bell = %self.name, "strike without a queued note ignored");
            return;
        };
        tracing::info!(bell = %self.name, velocity, length, "bell strike");
        self.strikes += 1;
        self.ringing = Some((ElapsedMillis::starting_at(self.clock.now_millis()), length));
    }

    fn update(&mut self) {
        if let Some((since, length)) = self.ringing {
            if since.elapsed(self.clock.now_millis()) >= length {
                tracing::debug!(bell = %self.name, "dampener engaged");
                self.ringing = None;
            }
        }
    }
}

/// Woodpecker that refuses strikes until its striker has recovered.
pub struct SimulatedPecker<C> {
    name: String,
    clock: C,
    cooldown_ms: u32,
    velocity: f64,
    last_strike: Option<ElapsedMillis>,
    rotating: Option<(ElapsedMillis, u32)>,
    strikes: usize,
    rotations: usize,
}

impl<C: TimeSource> SimulatedPecker<C> {
    /// Creates a pecker that needs `cooldown_ms` between accepted strikes.
    pub fn new(name: impl Into<String>, cooldown_ms: u32, clock: C) -> Self {
        Self {
            name: name.into(),
            clock,
            cooldown_ms,
            velocity: 0.0,
            last_strike: None,
            rotating: None,
            strikes: 0,
            rotations: 0,
        }
    }

    pub fn strikes(&self) -> usize {
        self.strikes
    }

    pub fn rotations(&self) -> usize {
        self.rotations
    }

    pub fn is_rotating(&self) -> bool {
        self.rotating.is_some()
    }
}

impl<C: TimeSource> PeckerMechanism for SimulatedPecker<C> {
    fn queue_strike(&mut self, velocity: f64) {
        self.velocity = velocity;
    }

    fn strike(&mut self) -> bool {
        let now = self.clock.now_millis();
        if let Some(last) = self.last_strike {
            if last.elapsed(now) < self.cooldown_ms {
                return false;
            }
        }
        tracing::info!(pecker = %self.name, velocity = self.velocity, "pecker strike");
        self.last_strike = Some(ElapsedMillis::starting_at(now));
        self.strikes += 1;
        true
    }

    fn rotate(&mut self, length: u32) {
        tracing::info!(pecker = %self.name, length, "pecker rotation");
        self.rotating = Some((ElapsedMillis::starting_at(self.clock.now_millis()), length));
        self.rotations += 1;
    }

    fn update(&mut self) {
        if let Some((since, length)) = self.rotating {
            if since.elapsed(self.clock.now_millis()) >= length {
                tracing::debug!(pecker = %self.name, "motor stopped");
                self.rotating = None;
            }
        }
    }
}

/// Light group that remembers the last colour it was wiped to.
#[derive(Debug, Clone)]
pub struct SimulatedLights {
    name: String,
    color: Rgb,
    brightness: f32,
    wipes: usize,
}

impl SimulatedLights {
    /// Creates a dark light group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: Rgb::BLACK,
            brightness: 0.0,
            wipes: 0,
        }
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    pub fn wipes(&self) -> usize {
        self.wipes
    }
}

impl LightGroup for SimulatedLights {
    fn wipe(&mut self, r: u8, g: u8, b: u8, brightness: f32) {
        tracing::debug!(group = %self.name, r, g, b, brightness, "color wipe");
        self.color = Rgb::new(r, g, b);
        self.brightness = brightness;
        self.wipes += 1;
    }
}

/// Handles to every simulated device linked by [`SimulatedRig::build`].
pub struct SimulatedRig<C> {
    pub bells: Vec<Rc<RefCell<SimulatedBell<C>>>>,
    pub peckers: Vec<Rc<RefCell<SimulatedPecker<C>>>>,
    pub lights: Vec<Rc<RefCell<SimulatedLights>>>,
}

impl<C: TimeSource + Clone + 'static> SimulatedRig<C> {
    /// Creates the devices described by `config` and links them to `engine`.
    pub fn build(config: &RigConfig, clock: &C, engine: &mut PlaybackEngine) -> Result<Self> {
        let mut rig = Self {
            bells: Vec::new(),
            peckers: Vec::new(),
            lights: Vec::new(),
        };

        for (index, frequency) in config.bells.iter().enumerate() {
            let bell = shared(SimulatedBell::new(
                format!("bell-{index}"),
                *frequency,
                clock.clone(),
            ));
            engine.link_bell_mechanism(bell.clone())?;
            rig.bells.push(bell);
        }

        for index in 0..config.peckers {
            let pecker = shared(SimulatedPecker::new(
                format!("pecker-{index}"),
                config.pecker_cooldown_ms,
                clock.clone(),
            ));
            engine.link_pecker_mechanism(pecker.clone())?;
            rig.peckers.push(pecker);
        }

        for index in 0..config.light_groups {
            let lights = shared(SimulatedLights::new(format!("lights-{index}")));
            engine.link_light_group(lights.clone())?;
            rig.lights.push(lights);
        }

        tracing::info!(
            bells = rig.bells.len(),
            peckers = rig.peckers.len(),
            lights = rig.lights.len(),
            "simulated rig linked"
        );
        Ok(rig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::EngineConfig, timing::ManualTimeSource, RigError, Rhythm};

    #[test]
    fn bell_dampens_after_its_length() {
        let clock = ManualTimeSource::new();
        let mut bell = SimulatedBell::new("test", 440.0, clock.clone());

        bell.queue_strike(1.0, 200);
        bell.strike();
        assert!(bell.is_ringing());

        clock.advance(199);
        bell.update();
        assert!(bell.is_ringing());

        clock.advance(1);
        bell.update();
        assert!(!bell.is_ringing());
        assert_eq!(bell.strikes(), 1);
    }

    #[test]
    fn bell_ignores_unqueued_strike() {
        let mut bell = SimulatedBell::new("test", 440.0, ManualTimeSource::new());
        bell.strike();
        assert_eq!(bell.strikes(), 0);
    }

    #[test]
    fn pecker_rejects_strikes_while_cooling_down() {
        let clock = ManualTimeSource::new();
        let mut pecker = SimulatedPecker::new("test", 40, clock.clone());

        assert!(pecker.strike());
        clock.advance(39);
        assert!(!pecker.strike());
        clock.advance(1);
        assert!(pecker.strike());
        assert_eq!(pecker.strikes(), 2);
    }

    #[test]
    fn pecker_motor_stops_after_length() {
        let clock = ManualTimeSource::new();
        let mut pecker = SimulatedPecker::new("test", 40, clock.clone());
        pecker.rotate(300);
        assert!(pecker.is_rotating());
        clock.advance(300);
        pecker.update();
        assert!(!pecker.is_rotating());
    }

    #[test]
    fn rig_plays_mixed_rhythm_to_completion() {
        let clock = ManualTimeSource::new();
        let mut engine = PlaybackEngine::with_clock(EngineConfig::default(), clock.clone());
        let config = RigConfig {
            bells: vec![220.0, 440.0],
            peckers: 1,
            pecker_cooldown_ms: 40,
            light_groups: 1,
            tick_interval_ms: 5,
        };
        let rig = SimulatedRig::build(&config, &clock, &mut engine).unwrap();

        let mut rhythm = Rhythm::new();
        rhythm.add_strike(0, 1.0).unwrap();
        rhythm.add_strike(20, 1.0).unwrap();
        rhythm.add_motor_move(0, 100, 150).unwrap();
        engine.play_rhythm(rhythm.into_handle()).unwrap();

        let mut ticks = 0;
        while engine.is_active() && ticks < 1_000 {
            engine.update().unwrap();
            clock.advance(5);
            ticks += 1;
        }

        assert!(!engine.is_active());
        assert!(rig.bells.iter().any(|bell| bell.borrow().strikes() > 0));
        assert!(rig.peckers[0].borrow().strikes() > 0);
        assert!(rig.lights[0].borrow().wipes() > 0);
    }

    #[test]
    fn rig_larger_than_engine_capacity_fails() {
        let clock = ManualTimeSource::new();
        let mut engine = PlaybackEngine::with_clock(EngineConfig::default(), clock.clone());
        let config = RigConfig {
            bells: vec![110.0, 220.0, 440.0, 880.0],
            ..RigConfig::default()
        };
        let err = SimulatedRig::build(&config, &clock, &mut engine).err().unwrap();
        assert!(matches!(err, RigError::CapacityExceeded { .. }));
    }
}
