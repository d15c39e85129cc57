//! Capabilities the playback engine drives. Concrete drivers live outside the
//! core; [`crate::sim`] ships software stand-ins.

use std::{
    cell::{Ref, RefCell, RefMut},
    rc::Rc,
};

use crate::{Result, RigError};

/// Tuned bell with a striker and, usually, a dampener.
pub trait BellMechanism {
    fn resonant_frequency(&self) -> f64;
    /// Arms the next strike. `length` is how long the bell may ring, in ms.
    fn queue_strike(&mut self, velocity: f64, length: u32);
    fn strike(&mut self);
    /// Advances internal timers such as dampener release.
    fn update(&mut self);
}

/// Unpitched percussive actuator that can also run its motor.
pub trait PeckerMechanism {
    fn queue_strike(&mut self, velocity: f64);
    /// Returns `false` when the mechanism is not ready to strike yet.
    fn strike(&mut self) -> bool;
    fn rotate(&mut self, length: u32);
    fn update(&mut self);
}

/// Strip segment used for visual feedback.
pub trait LightGroup {
    fn wipe(&mut self, r: u8, g: u8, b: u8, brightness: f32);
}

pub type SharedBell = Rc<RefCell<dyn BellMechanism>>;
pub type SharedPecker = Rc<RefCell<dyn PeckerMechanism>>;
pub type SharedLights = Rc<RefCell<dyn LightGroup>>;

/// Wraps a collaborator so it can be linked to an engine and still be
/// reached by its owner.
pub fn shared<T>(value: T) -> Rc<RefCell<T>> {
    Rc::new(RefCell::new(value))
}

pub(crate) fn borrow<'a, T: ?Sized>(
    cell: &'a Rc<RefCell<T>>,
    what: &'static str,
) -> Result<Ref<'a, T>> {
    cell.try_borrow().map_err(|_| RigError::Borrowed(what))
}

pub(crate) fn borrow_mut<'a, T: ?Sized>(
    cell: &'a Rc<RefCell<T>>,
    what: &'static str,
) -> Result<RefMut<'a, T>> {
    cell.try_borrow_mut().map_err(|_| RigError::Borrowed(what))
}
