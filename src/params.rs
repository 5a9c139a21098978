//! Parameter store
//!
//! The values the UI (or a host automation lane) writes and the control thread
//! reads: a mute flag for the audio input, and a kind choice plus bypass flag
//! per slot. Values are atomics so writers never wait on the control thread;
//! [`GraphParams::snapshot`] reads a consistent-enough copy once per tick.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use tracing::debug;

use crate::error::ParamError;
use crate::slots::SlotKind;

/// What kind of value a parameter holds.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ParamKind {
    Bool { default: bool },
    Choice { choices: &'static [&'static str], default: usize },
}

/// Static description of one parameter.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ParamDescriptor {
    /// Stable identifier used by hosts (`"mute"`, `"slot1"`, `"bypass1"`, ...)
    pub id: String,
    /// Display name
    pub name: String,
    pub kind: ParamKind,
}

#[derive(Clone, Copy, Debug)]
enum Target {
    Mute,
    Slot(usize),
    Bypass(usize),
}

/// User requests coming from the UI.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SlotEvent {
    KindChanged { slot: usize, kind: SlotKind },
    BypassToggled { slot: usize },
    MuteToggled,
}

/// Parameters of one slot, as read by a snapshot.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct SlotParams {
    pub kind: SlotKind,
    pub bypass: bool,
}

/// Plain copy of every parameter value.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ParamSnapshot {
    pub mute: bool,
    pub slots: Vec<SlotParams>,
}

impl ParamSnapshot {
    /// Default values: muted input, every slot empty and active.
    pub fn new(slot_count: usize) -> Self {
        Self {
            mute: true,
            slots: vec![SlotParams::default(); slot_count],
        }
    }

    pub fn with_mute(mut self, mute: bool) -> Self {
        self.mute = mute;
        self
    }

    pub fn with_kind(mut self, slot: usize, kind: SlotKind) -> Self {
        if let Some(params) = self.slots.get_mut(slot) {
            params.kind = kind;
        }
        self
    }

    pub fn with_bypass(mut self, slot: usize, bypass: bool) -> Self {
        if let Some(params) = self.slots.get_mut(slot) {
            params.bypass = bypass;
        }
        self
    }
}

/// Shared parameter values for a slot graph.
///
/// Meant to live in an `Arc` shared by the UI, the host and the control thread.
pub struct GraphParams {
    descriptors: Vec<ParamDescriptor>,
    targets: Vec<Target>,
    mute: AtomicBool,
    kinds: Vec<AtomicU8>,
    bypass: Vec<AtomicBool>,
}

impl GraphParams {
    pub fn new(slot_count: usize) -> Self {
        let mut descriptors = Vec::with_capacity(1 + 2 * slot_count);
        let mut targets = Vec::with_capacity(1 + 2 * slot_count);

        descriptors.push(ParamDescriptor {
            id: "mute".into(),
            name: "Mute Input".into(),
            kind: ParamKind::Bool { default: true },
        });
        targets.push(Target::Mute);

        for slot in 0..slot_count {
            descriptors.push(ParamDescriptor {
                id: format!("slot{}", slot + 1),
                name: format!("Slot {}", slot + 1),
                kind: ParamKind::Choice {
                    choices: &SlotKind::CHOICES,
                    default: SlotKind::Empty.index(),
                },
            });
            targets.push(Target::Slot(slot));
        }

        for slot in 0..slot_count {
            descriptors.push(ParamDescriptor {
                id: format!("bypass{}", slot + 1),
                name: format!("Bypass {}", slot + 1),
                kind: ParamKind::Bool { default: false },
            });
            targets.push(Target::Bypass(slot));
        }

        Self {
            descriptors,
            targets,
            mute: AtomicBool::new(true),
            kinds: (0..slot_count).map(|_| AtomicU8::new(SlotKind::Empty.index() as u8)).collect(),
            bypass: (0..slot_count).map(|_| AtomicBool::new(false)).collect(),
        }
    }

    pub fn descriptors(&self) -> &[ParamDescriptor] {
        &self.descriptors
    }

    pub fn slot_count(&self) -> usize {
        self.kinds.len()
    }

    pub fn mute(&self) -> bool {
        self.mute.load(Ordering::Relaxed)
    }

    pub fn set_mute(&self, mute: bool) {
        self.mute.store(mute, Ordering::Relaxed);
    }

    pub fn slot_kind(&self, slot: usize) -> Result<SlotKind, ParamError> {
        let raw = self.kinds.get(slot).ok_or_else(|| self.out_of_range(slot))?.load(Ordering::Relaxed);
        Ok(SlotKind::from_index(raw as usize).unwrap_or_default())
    }

    pub fn set_slot_kind(&self, slot: usize, kind: SlotKind) -> Result<(), ParamError> {
        let value = self.kinds.get(slot).ok_or_else(|| self.out_of_range(slot))?;
        value.store(kind.index() as u8, Ordering::Relaxed);
        Ok(())
    }

    pub fn bypass(&self, slot: usize) -> Result<bool, ParamError> {
        Ok(self.bypass.get(slot).ok_or_else(|| self.out_of_range(slot))?.load(Ordering::Relaxed))
    }

    pub fn set_bypass(&self, slot: usize, bypass: bool) -> Result<(), ParamError> {
        self.bypass.get(slot).ok_or_else(|| self.out_of_range(slot))?.store(bypass, Ordering::Relaxed);
        Ok(())
    }

    /// Set a parameter from a host-normalized value in `0.0..=1.0`.
    ///
    /// Booleans switch on at 0.5; choices map evenly onto their options.
    pub fn set_normalized(&self, id: &str, value: f32) -> Result<(), ParamError> {
        let value = value.clamp(0.0, 1.0);
        match self.target(id)? {
            Target::Mute => self.set_mute(value >= 0.5),
            Target::Slot(slot) => {
                let last = (SlotKind::CHOICES.len() - 1) as f32;
                let kind = SlotKind::from_index((value * last).round() as usize).unwrap_or_default();
                self.set_slot_kind(slot, kind)?;
            }
            Target::Bypass(slot) => self.set_bypass(slot, value >= 0.5)?,
        }
        debug!(id, value, "set parameter");
        Ok(())
    }

    /// Host-normalized value of a parameter.
    pub fn normalized(&self, id: &str) -> Result<f32, ParamError> {
        let flag = |on: bool| if on { 1.0 } else { 0.0 };
        Ok(match self.target(id)? {
            Target::Mute => flag(self.mute()),
            Target::Slot(slot) => {
                self.slot_kind(slot)?.index() as f32 / (SlotKind::CHOICES.len() - 1) as f32
            }
            Target::Bypass(slot) => flag(self.bypass(slot)?),
        })
    }

    /// Apply a UI event.
    pub fn apply(&self, event: SlotEvent) -> Result<(), ParamError> {
        match event {
            SlotEvent::KindChanged { slot, kind } => self.set_slot_kind(slot, kind)?,
            SlotEvent::BypassToggled { slot } => {
                self.bypass.get(slot).ok_or_else(|| self.out_of_range(slot))?.fetch_xor(true, Ordering::Relaxed);
            }
            SlotEvent::MuteToggled => {
                self.mute.fetch_xor(true, Ordering::Relaxed);
            }
        }
        debug!(?event, "applied slot event");
        Ok(())
    }

    /// Read every value once.
    pub fn snapshot(&self) -> ParamSnapshot {
        ParamSnapshot {
            mute: self.mute(),
            slots: self
                .kinds
                .iter()
                .zip(&self.bypass)
                .map(|(kind, bypass)| SlotParams {
                    kind: SlotKind::from_index(kind.load(Ordering::Relaxed) as usize).unwrap_or_default(),
                    bypass: bypass.load(Ordering::Relaxed),
                })
                .collect(),
        }
    }

    fn target(&self, id: &str) -> Result<Target, ParamError> {
        self.descriptors
            .iter()
            .position(|d| d.id == id)
            .map(|pos| self.targets[pos])
            .ok_or_else(|| ParamError::UnknownParameter(id.to_owned()))
    }

    fn out_of_range(&self, slot: usize) -> ParamError {
        ParamError::SlotOutOfRange { slot, slots: self.kinds.len() }
    }
}

impl Default for GraphParams {
    fn default() -> Self {
        Self::new(crate::slots::DEFAULT_SLOT_COUNT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_descriptors() {
        let params = GraphParams::default();
        let snapshot = params.snapshot();

        assert!(snapshot.mute);
        assert_eq!(snapshot, ParamSnapshot::new(3));
        assert_eq!(params.descriptors().len(), 7);
        assert_eq!(params.descriptors()[1].id, "slot1");
        assert_eq!(params.descriptors()[4].id, "bypass1");
    }

    #[test]
    fn normalized_choice_maps_onto_kinds() {
        let params = GraphParams::new(2);

        params.set_normalized("slot2", 1.0).unwrap();
        assert_eq!(params.slot_kind(1).unwrap(), SlotKind::Filter);

        params.set_normalized("slot2", 0.34).unwrap();
        assert_eq!(params.slot_kind(1).unwrap(), SlotKind::Oscillator);
        assert!((params.normalized("slot2").unwrap() - 1.0 / 3.0).abs() < 1e-6);

        params.set_normalized("mute", 0.2).unwrap();
        assert!(!params.mute());
    }

    #[test]
    fn events_toggle_flags() {
        let params = GraphParams::new(1);

        params.apply(SlotEvent::BypassToggled { slot: 0 }).unwrap();
        params.apply(SlotEvent::MuteToggled).unwrap();
        params.apply(SlotEvent::KindChanged { slot: 0, kind: SlotKind::Gain }).unwrap();

        let snapshot = params.snapshot();
        assert!(!snapshot.mute);
        assert_eq!(snapshot.slots[0], SlotParams { kind: SlotKind::Gain, bypass: true });
    }

    #[test]
    fn bad_targets_are_rejected() {
        let params = GraphParams::new(1);

        assert_eq!(
            params.apply(SlotEvent::BypassToggled { slot: 4 }),
            Err(ParamError::SlotOutOfRange { slot: 4, slots: 1 })
        );
        assert_eq!(
            params.set_normalized("volume", 0.5),
            Err(ParamError::UnknownParameter("volume".into()))
        );
    }
}
