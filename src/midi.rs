//! Fixed-capacity MIDI event lists
//!
//! Event lists travel through the render path, so they never allocate: each one
//! is an inline [`ArrayVec`] and pushing into a full list hands the event back.

use arrayvec::ArrayVec;

/// Maximum number of events one [`MidiBuffer`] can hold.
pub const MIDI_BUFFER_CAPACITY: usize = 512;

/// A short (up to three byte) MIDI message at a frame offset within a block.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MidiEvent {
    /// Offset in frames from the start of the block the event belongs to
    pub frame: u32,
    /// Raw status and data bytes
    pub bytes: [u8; 3],
}

impl MidiEvent {
    pub fn new(frame: u32, bytes: [u8; 3]) -> Self {
        Self { frame, bytes }
    }

    pub fn note_on(frame: u32, channel: u8, note: u8, velocity: u8) -> Self {
        Self::new(frame, [0x90 | (channel & 0x0f), note & 0x7f, velocity & 0x7f])
    }

    pub fn note_off(frame: u32, channel: u8, note: u8) -> Self {
        Self::new(frame, [0x80 | (channel & 0x0f), note & 0x7f, 0])
    }

    /// Same message, shifted to another frame offset.
    #[inline]
    pub fn at(self, frame: u32) -> Self {
        Self { frame, ..self }
    }
}

/// An ordered, fixed-capacity list of [`MidiEvent`]s.
#[derive(Clone, Default, Debug)]
pub struct MidiBuffer {
    events: ArrayVec<MidiEvent, MIDI_BUFFER_CAPACITY>,
}

impl MidiBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    ///
    /// Returns `Err(event)` if the buffer is full (event dropped).
    #[inline]
    pub fn push(&mut self, event: MidiEvent) -> Result<(), MidiEvent> {
        self.events.try_push(event).map_err(|e| e.element())
    }

    #[inline]
    pub fn clear(&mut self) {
        self.events.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &MidiEvent> + '_ {
        self.events.iter()
    }

    #[inline]
    pub fn as_slice(&self) -> &[MidiEvent] {
        &self.events
    }
}

impl<'a> IntoIterator for &'a MidiBuffer {
    type Item = &'a MidiEvent;
    type IntoIter = core::slice::Iter<'a, MidiEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

impl Extend<MidiEvent> for MidiBuffer {
    /// Extends until full; events past capacity are dropped.
    fn extend<I: IntoIterator<Item = MidiEvent>>(&mut self, iter: I) {
        for event in iter {
            if self.push(event).is_err() {
                break;
            }
        }
    }
}
