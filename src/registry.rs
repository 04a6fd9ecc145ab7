//! Handle registry
//!
//! Long-lived instances are stored in a slot map and addressed by a
//! [`Handle`]: a slot index plus the generation the slot had when the
//! instance was stored. Releasing an instance bumps the slot's generation,
//! so a stale handle never resolves to whatever reuses the slot later.
//!
//! Hosts see handles as plain numbers. [`Handle::to_f64`] encodes both
//! halves into one integral value that an `f64` represents exactly, and
//! [`Handle::from_f64`] refuses anything that is not such a value.

use crate::core::{Kind, Result, SVMError};
use crate::model::Model;
use crate::parameter::Parameter;
use crate::problem::Problem;
use log::debug;
use std::collections::HashMap;
use std::fmt;

const INDEX_BITS: u32 = 24;
const INDEX_LIMIT: u32 = 1 << INDEX_BITS;
const GENERATION_LIMIT: u32 = 1 << 29;

/// Opaque reference to a registered instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    /// Host encoding: `generation * 2^24 + index`
    ///
    /// Generations start at 1, so a valid handle is never 0.
    pub fn to_f64(self) -> f64 {
        ((u64::from(self.generation) << INDEX_BITS) | u64::from(self.index)) as f64
    }

    /// Decode a host number, rejecting anything no handle encodes to
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 1.0 || value.fract() != 0.0 {
            return None;
        }
        if value >= f64::from(GENERATION_LIMIT) * f64::from(INDEX_LIMIT) {
            return None;
        }
        let raw = value as u64;
        let index = (raw & u64::from(INDEX_LIMIT - 1)) as u32;
        let generation = (raw >> INDEX_BITS) as u32;
        if generation == 0 {
            return None;
        }
        Some(Self { index, generation })
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

/// A registered instance of any kind
#[derive(Debug)]
pub enum Entry {
    Problem(Problem),
    Parameter(Parameter),
    Model(Model),
}

impl Entry {
    pub fn kind(&self) -> Kind {
        match self {
            Entry::Problem(_) => Kind::Problem,
            Entry::Parameter(_) => Kind::Parameter,
            Entry::Model(_) => Kind::Model,
        }
    }
}

/// Types that can be stored in a [`HandleRegistry`]
pub trait Registered: Sized {
    const KIND: Kind;

    fn into_entry(self) -> Entry;

    fn from_entry(entry: &Entry) -> Option<&Self>;
}

impl Registered for Problem {
    const KIND: Kind = Kind::Problem;

    fn into_entry(self) -> Entry {
        Entry::Problem(self)
    }

    fn from_entry(entry: &Entry) -> Option<&Self> {
        match entry {
            Entry::Problem(problem) => Some(problem),
            _ => None,
        }
    }
}

impl Registered for Parameter {
    const KIND: Kind = Kind::Parameter;

    fn into_entry(self) -> Entry {
        Entry::Parameter(self)
    }

    fn from_entry(entry: &Entry) -> Option<&Self> {
        match entry {
            Entry::Parameter(parameter) => Some(parameter),
            _ => None,
        }
    }
}

impl Registered for Model {
    const KIND: Kind = Kind::Model;

    fn into_entry(self) -> Entry {
        Entry::Model(self)
    }

    fn from_entry(entry: &Entry) -> Option<&Self> {
        match entry {
            Entry::Model(model) => Some(model),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
    owner: Option<String>,
}

/// Generation-checked slot map of problems, parameters and models
#[derive(Debug, Default)]
pub struct HandleRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    owners: HashMap<String, Handle>,
    live: usize,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an instance that no caller owns
    pub fn register<T: Registered>(&mut self, value: T) -> Result<Handle> {
        self.register_for(None, value)
    }

    /// Store an instance on behalf of `owner`
    ///
    /// If `owner` already holds a handle, the instance behind it is
    /// released once the new one is stored.
    pub fn register_for<T: Registered>(&mut self, owner: Option<&str>, value: T) -> Result<Handle> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let next = self.slots.len() as u32;
                if next >= INDEX_LIMIT {
                    return Err(SVMError::Allocation(format!("no free {} handles", T::KIND)));
                }
                self.slots.push(Slot {
                    generation: 1,
                    entry: None,
                    owner: None,
                });
                next
            }
        };

        let slot = &mut self.slots[index as usize];
        slot.entry = Some(value.into_entry());
        slot.owner = owner.map(str::to_string);
        let handle = Handle {
            index,
            generation: slot.generation,
        };
        self.live += 1;
        debug!("Registered {} handle {handle}", T::KIND);

        if let Some(owner) = owner {
            if let Some(previous) = self.owners.insert(owner.to_string(), handle) {
                if let Err(e) = self.release(previous) {
                    debug!("Previous handle {previous} of {owner} already gone: {e}");
                }
            }
        }
        Ok(handle)
    }

    fn slot(&self, handle: Handle) -> Option<&Slot> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation && slot.entry.is_some())
    }

    /// Borrow the live instance of kind `T` behind `handle`
    pub fn resolve<T: Registered>(&self, handle: Handle) -> Result<&T> {
        self.slot(handle)
            .and_then(|slot| slot.entry.as_ref())
            .and_then(T::from_entry)
            .ok_or(SVMError::InvalidHandle { kind: T::KIND })
    }

    /// Kind of the live instance behind `handle`, if any
    pub fn kind_of(&self, handle: Handle) -> Option<Kind> {
        self.slot(handle)
            .and_then(|slot| slot.entry.as_ref())
            .map(Entry::kind)
    }

    /// Destroy the instance behind `handle` and invalidate the handle
    pub fn release(&mut self, handle: Handle) -> Result<()> {
        if self.slot(handle).is_none() {
            return Err(SVMError::UnknownHandle);
        }
        let entry = self.vacate(handle.index);
        if let Some(entry) = entry {
            debug!("Released {} handle {handle}", entry.kind());
        }
        Ok(())
    }

    /// Empty a slot, advance its generation and return what it held
    fn vacate(&mut self, index: u32) -> Option<Entry> {
        let slot = &mut self.slots[index as usize];
        let entry = slot.entry.take();
        let handle = Handle {
            index,
            generation: slot.generation,
        };

        if let Some(owner) = slot.owner.take() {
            if self.owners.get(&owner) == Some(&handle) {
                self.owners.remove(&owner);
            }
        }

        slot.generation += 1;
        if slot.generation < GENERATION_LIMIT {
            self.free.push(index);
        } else {
            debug!("Retiring handle slot {index}");
        }
        if entry.is_some() {
            self.live -= 1;
        }
        entry
    }

    /// Handles of every live instance, in slot order
    pub fn handles(&self) -> Vec<Handle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.entry.is_some())
            .map(|(index, slot)| Handle {
                index: index as u32,
                generation: slot.generation,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Release every instance; all outstanding handles become invalid
    pub fn clear(&mut self) {
        let occupied: Vec<u32> = self.handles().iter().map(|h| h.index).collect();
        let count = occupied.len();
        for index in occupied {
            drop(self.vacate(index));
        }
        self.owners.clear();
        debug!("Cleared {count} handles");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SvmType;
    use crate::solver::LibSvm;
    use std::sync::Arc;

    fn problem() -> Problem {
        Problem::new(2, &[1.0, -1.0], 1, &[1.0, -1.0]).unwrap()
    }

    #[test]
    fn test_handle_encoding() {
        let handle = Handle {
            index: 5,
            generation: 3,
        };
        assert_eq!(handle.to_f64(), 3.0 * 16_777_216.0 + 5.0);
        assert_eq!(Handle::from_f64(handle.to_f64()), Some(handle));

        let largest = Handle {
            index: INDEX_LIMIT - 1,
            generation: GENERATION_LIMIT - 1,
        };
        assert_eq!(Handle::from_f64(largest.to_f64()), Some(largest));
    }

    #[test]
    fn test_decode_rejects_malformed_numbers() {
        for value in [
            0.0,
            -1.0,
            0.5,
            16_777_216.5,
            f64::NAN,
            f64::INFINITY,
            f64::NEG_INFINITY,
            // generation 0
            42.0,
            // generation past the limit
            f64::from(GENERATION_LIMIT) * f64::from(INDEX_LIMIT),
            1e300,
        ] {
            assert_eq!(Handle::from_f64(value), None, "{value} decoded");
        }
    }

    #[test]
    fn test_resolve_checks_kind() {
        let mut registry = HandleRegistry::new();
        let handle = registry.register(problem()).unwrap();

        assert_eq!(registry.resolve::<Problem>(handle).unwrap().rows(), 2);
        assert_eq!(registry.kind_of(handle), Some(Kind::Problem));

        let err = registry.resolve::<Parameter>(handle).unwrap_err();
        assert_eq!(err.to_string(), "invalid parameter handle");
        assert!(registry.resolve::<Model>(handle).is_err());
    }

    #[test]
    fn test_released_handle_is_stale() {
        let mut registry = HandleRegistry::new();
        let first = registry.register(Parameter::default()).unwrap();
        registry.release(first).unwrap();

        assert!(registry.resolve::<Parameter>(first).is_err());
        assert!(matches!(
            registry.release(first),
            Err(SVMError::UnknownHandle)
        ));

        // The slot is reused under a new generation
        let second = registry.register(Parameter::default()).unwrap();
        assert_eq!(second.index, first.index);
        assert_ne!(second.to_f64(), first.to_f64());
        assert!(registry.resolve::<Parameter>(first).is_err());
        assert!(registry.resolve::<Parameter>(second).is_ok());
    }

    #[test]
    fn test_exhausted_slot_is_retired() {
        let mut registry = HandleRegistry::new();
        let handle = registry.register(Parameter::default()).unwrap();
        registry.slots[handle.index as usize].generation = GENERATION_LIMIT - 1;
        let last = Handle {
            index: handle.index,
            generation: GENERATION_LIMIT - 1,
        };

        registry.release(last).unwrap();
        let next = registry.register(Parameter::default()).unwrap();
        assert_ne!(next.index, handle.index);
    }

    #[test]
    fn test_owner_replacement_releases_previous() {
        let mut registry = HandleRegistry::new();
        let first = registry.register_for(Some("A1"), problem()).unwrap();
        let other = registry.register_for(Some("B1"), problem()).unwrap();
        let second = registry.register_for(Some("A1"), problem()).unwrap();

        assert!(registry.resolve::<Problem>(first).is_err());
        assert!(registry.resolve::<Problem>(second).is_ok());
        assert!(registry.resolve::<Problem>(other).is_ok());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unowned_registrations_accumulate() {
        let mut registry = HandleRegistry::new();
        let a = registry.register(problem()).unwrap();
        let b = registry.register(problem()).unwrap();

        assert_eq!(registry.handles(), vec![a, b]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_problem_release_keeps_model() {
        let mut registry = HandleRegistry::new();
        let problem_handle = registry.register(problem()).unwrap();
        let model = {
            let problem = registry.resolve::<Problem>(problem_handle).unwrap();
            Model::train(problem, &Parameter::default(), Arc::new(LibSvm)).unwrap()
        };
        let model_handle = registry.register(model).unwrap();

        registry.release(problem_handle).unwrap();
        let model = registry.resolve::<Model>(model_handle).unwrap();
        assert_eq!(model.svm_type(), SvmType::CSvc);
        assert_eq!(model.predict(&[1.0]), 1.0);
    }

    #[test]
    fn test_clear_invalidates_everything() {
        let mut registry = HandleRegistry::new();
        let a = registry.register_for(Some("A1"), problem()).unwrap();
        let b = registry.register(Parameter::default()).unwrap();

        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.handles().is_empty());
        assert!(registry.resolve::<Problem>(a).is_err());
        assert!(registry.resolve::<Parameter>(b).is_err());

        // The old owner entry no longer triggers a release
        let c = registry.register_for(Some("A1"), problem()).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.resolve::<Problem>(c).is_ok());
    }
}
