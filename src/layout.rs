//! Host bus configuration.

use core::fmt;

/// Channel set of one host bus.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ChannelSet {
    Disabled,
    Mono,
    Stereo,
}

impl ChannelSet {
    pub fn channels(self) -> usize {
        match self {
            ChannelSet::Disabled => 0,
            ChannelSet::Mono => 1,
            ChannelSet::Stereo => 2,
        }
    }
}

/// Main input and output bus of the host, as negotiated before `prepare`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct BusLayout {
    pub input: ChannelSet,
    pub output: ChannelSet,
}

impl BusLayout {
    pub fn new(input: ChannelSet, output: ChannelSet) -> Self {
        Self { input, output }
    }

    pub fn mono() -> Self {
        Self::new(ChannelSet::Mono, ChannelSet::Mono)
    }

    pub fn stereo() -> Self {
        Self::new(ChannelSet::Stereo, ChannelSet::Stereo)
    }

    /// Mono-to-mono and stereo-to-stereo only; both buses must be enabled.
    pub fn is_supported(&self) -> bool {
        if self.input == ChannelSet::Disabled || self.output == ChannelSet::Disabled {
            return false;
        }

        self.input == self.output
    }

    /// Channels carried by every node of a graph using this layout.
    pub fn channels(&self) -> usize {
        self.output.channels()
    }
}

impl Default for BusLayout {
    fn default() -> Self {
        Self::stereo()
    }
}

impl fmt::Display for BusLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} -> {:?}", self.input, self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_matching_enabled_layouts_are_supported() {
        assert!(BusLayout::mono().is_supported());
        assert!(BusLayout::stereo().is_supported());
        assert!(!BusLayout::new(ChannelSet::Mono, ChannelSet::Stereo).is_supported());
        assert!(!BusLayout::new(ChannelSet::Disabled, ChannelSet::Stereo).is_supported());
        assert!(!BusLayout::new(ChannelSet::Stereo, ChannelSet::Disabled).is_supported());
    }
}
