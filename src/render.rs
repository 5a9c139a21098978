//! Renderer - the audio-thread half of a graph

use core::mem;

use dasp_graph::Buffer;
use rtrb::{Consumer, Producer};

use crate::error::GraphError;
use crate::midi::MidiBuffer;
use crate::node::{NodeId, NodeState, ProcessBlock, ProcessContext, StageRole};
use crate::plan::RenderPlan;

/// Plays the plans published by a [`ProcessGraph`](crate::ProcessGraph).
///
/// Created together with its graph by [`ProcessGraph::new`](crate::ProcessGraph::new)
/// and meant to be moved onto the audio thread. [`render`](Self::render) never
/// blocks, never allocates and never frees: new plans arrive through a wait-free
/// queue and replaced plans are sent back to the control thread.
pub struct Renderer {
    plan: RenderPlan,
    incoming: Consumer<RenderPlan>,
    retired: Producer<RenderPlan>,
    /// Host events staged for the current block
    midi_in: MidiBuffer,
    faults: u64,
}

impl Renderer {
    pub(crate) fn new(plan: RenderPlan, incoming: Consumer<RenderPlan>, retired: Producer<RenderPlan>) -> Self {
        Self {
            plan,
            incoming,
            retired,
            midi_in: MidiBuffer::new(),
            faults: 0,
        }
    }

    /// Render one host block in place.
    ///
    /// `audio` holds one slice per host channel, carrying the input on entry and
    /// the output on return. `events` works the same way for MIDI. Blocks of any
    /// length are split into sub-blocks of [`Buffer::LEN`] frames.
    ///
    /// Returns [`GraphError::NotPrepared`] and leaves both buffers untouched if
    /// the current plan was published before `prepare` (or after `release`).
    pub fn render(&mut self, audio: &mut [&mut [f32]], events: &mut MidiBuffer) -> Result<(), GraphError> {
        self.adopt_pending();

        let Some(ctx) = self.plan.ctx else {
            return Err(GraphError::NotPrepared);
        };

        let frames_total = audio.iter().map(|channel| channel.len()).min().unwrap_or(0);

        self.midi_in.clear();
        self.midi_in.extend(events.iter().copied());
        events.clear();

        let mut offset = 0;
        while offset < frames_total {
            let frames = (frames_total - offset).min(Buffer::LEN);

            if self.render_chunk(&ctx, audio, events, offset, frames).is_err() {
                // Whatever was not rendered passes through as it came in
                self.faults += 1;
                let start = offset as u32;
                events.extend(self.midi_in.iter().filter(|e| e.frame >= start).copied());
                break;
            }

            offset += frames;
        }

        for channel in audio.iter_mut().skip(ctx.channels) {
            channel.fill(0.0);
        }

        Ok(())
    }

    /// Number of blocks cut short because a node's state was already borrowed.
    pub fn faults(&self) -> u64 {
        self.faults
    }

    /// Version of the plan currently being rendered.
    pub fn version(&self) -> u64 {
        self.plan.version
    }

    /// True once a plan published after `prepare` has been picked up.
    pub fn is_prepared(&self) -> bool {
        self.plan.is_prepared()
    }

    /// Switch to the newest published plan, retiring the ones it replaces.
    fn adopt_pending(&mut self) {
        while let Ok(plan) = self.incoming.pop() {
            let old = mem::replace(&mut self.plan, plan);
            if let Err(rtrb::PushError::Full(old)) = self.retired.push(old) {
                // The publisher never lets this queue fill up; leak rather than free here
                mem::forget(old);
            }
        }
    }

    fn render_chunk(
        &self,
        ctx: &ProcessContext,
        audio: &mut [&mut [f32]],
        events: &mut MidiBuffer,
        offset: usize,
        frames: usize,
    ) -> Result<(), NodeId> {
        let plan = &self.plan;
        let end = offset + frames;

        for step in &plan.steps {
            let node = &step.node;
            let mut state = node.state.try_borrow_mut().map_err(|_| node.id())?;
            state.clear(frames);

            for route in &step.audio_routes {
                let source = plan.steps[route.source_step]
                    .node
                    .state
                    .try_borrow()
                    .map_err(|_| node.id())?;
                state.audio[route.channel][..frames].copy_from_slice(&source.audio[route.source_channel][..frames]);
            }

            for &source_step in &step.event_sources {
                let source = plan.steps[source_step].node.state.try_borrow().map_err(|_| node.id())?;
                state.events.extend(source.events.iter().copied());
            }

            if node.is_bypassed() {
                continue;
            }

            match node.role() {
                StageRole::AudioInput => {
                    for (buffer, host) in state.audio.iter_mut().zip(audio.iter()) {
                        buffer[..frames].copy_from_slice(&host[offset..end]);
                    }
                }
                StageRole::MidiInput => {
                    let (start, stop) = (offset as u32, end as u32);
                    let chunk = self.midi_in.iter().filter(|e| e.frame >= start && e.frame < stop);
                    state.events.extend(chunk.map(|e| e.at(e.frame - start)));
                }
                StageRole::AudioOutput | StageRole::MidiOutput => {}
                StageRole::Processor => {
                    let NodeState { stage, audio, events } = &mut *state;
                    stage.process(ctx, ProcessBlock { audio, frames, events });
                }
            }
        }

        // Host buffers stay untouched until every output can be read
        let outputs = plan.audio_outputs.iter().chain(&plan.midi_outputs);
        for &step in outputs {
            let node = &plan.steps[step].node;
            node.state.try_borrow().map_err(|_| node.id())?;
        }

        for channel in audio.iter_mut().take(ctx.channels) {
            channel[offset..end].fill(0.0);
        }

        for &step in &plan.audio_outputs {
            let node = &plan.steps[step].node;
            let state = node.state.try_borrow().map_err(|_| node.id())?;
            for (host, buffer) in audio.iter_mut().zip(state.audio.iter()) {
                for (out, sample) in host[offset..end].iter_mut().zip(&buffer[..frames]) {
                    *out += *sample;
                }
            }
        }

        for &step in &plan.midi_outputs {
            let node = &plan.steps[step].node;
            let state = node.state.try_borrow().map_err(|_| node.id())?;
            events.extend(state.events.iter().map(|e| e.at(e.frame + offset as u32)));
        }

        Ok(())
    }
}
