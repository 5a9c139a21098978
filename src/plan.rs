//! Render plans and the lock-free queues that carry them.
//!
//! A [`RenderPlan`] is an immutable snapshot of one render sequence: the nodes
//! in order plus, for each, where its inputs come from. The control thread
//! builds a plan completely and pushes it to the renderer. The renderer never
//! drops a plan; it sends the one it replaced back on a second queue so every
//! deallocation happens on the control thread.

use std::sync::Arc;

use hashbrown::HashMap;
use rtrb::{Consumer, Producer, RingBuffer};
use tracing::warn;

use crate::connection::Channel;
use crate::graph::Topology;
use crate::node::{Node, NodeId, ProcessContext, StageRole};
use crate::render::Renderer;

/// Plans that may be in flight between the two threads at once.
pub const DEFAULT_PLAN_QUEUE_CAPACITY: usize = 8;

/// Copy one audio channel of an earlier step into a channel of this step.
#[derive(Clone, Copy, Debug)]
pub(crate) struct AudioRoute {
    pub(crate) source_step: usize,
    pub(crate) source_channel: usize,
    pub(crate) channel: usize,
}

pub(crate) struct RenderStep {
    pub(crate) node: Arc<Node>,
    pub(crate) audio_routes: Vec<AudioRoute>,
    pub(crate) event_sources: Vec<usize>,
}

pub(crate) struct RenderPlan {
    pub(crate) version: u64,
    pub(crate) ctx: Option<ProcessContext>,
    pub(crate) steps: Vec<RenderStep>,
    /// Steps whose audio goes back to the host
    pub(crate) audio_outputs: Vec<usize>,
    /// Steps whose events go back to the host
    pub(crate) midi_outputs: Vec<usize>,
}

impl RenderPlan {
    pub(crate) fn empty() -> Self {
        Self {
            version: 0,
            ctx: None,
            steps: Vec::new(),
            audio_outputs: Vec::new(),
            midi_outputs: Vec::new(),
        }
    }

    /// Build a plan for `order`, which must be a valid topological order of `topology`.
    pub(crate) fn build(topology: &Topology, order: &[NodeId], version: u64) -> Self {
        let position: HashMap<NodeId, usize> =
            order.iter().enumerate().map(|(step, &id)| (id, step)).collect();

        let mut steps = Vec::with_capacity(order.len());
        let mut audio_outputs = Vec::new();
        let mut midi_outputs = Vec::new();

        for &id in order {
            let Some(node) = topology.node(id) else { continue };

            let mut audio_routes = Vec::new();
            let mut event_sources = Vec::new();

            for connection in topology.incoming(id) {
                let Some(&source_step) = position.get(&connection.source.node) else {
                    continue;
                };

                match (connection.source.channel, connection.destination.channel) {
                    (Channel::Audio(source_channel), Channel::Audio(channel)) => {
                        audio_routes.push(AudioRoute { source_step, source_channel, channel });
                    }
                    (Channel::Events, Channel::Events) => event_sources.push(source_step),
                    _ => {}
                }
            }

            match node.role() {
                StageRole::AudioOutput => audio_outputs.push(steps.len()),
                StageRole::MidiOutput => midi_outputs.push(steps.len()),
                _ => {}
            }

            steps.push(RenderStep {
                node: Arc::clone(node),
                audio_routes,
                event_sources,
            });
        }

        Self {
            version,
            ctx: topology.context(),
            steps,
            audio_outputs,
            midi_outputs,
        }
    }

    #[inline]
    pub(crate) fn is_prepared(&self) -> bool {
        self.ctx.is_some()
    }
}

/// Control-side end of the plan queues.
pub(crate) struct PlanPublisher {
    to_renderer: Producer<RenderPlan>,
    retired: Consumer<RenderPlan>,
    /// Newest plan, waiting for room in the queue
    held: Option<RenderPlan>,
    /// Plans handed over and not yet reclaimed, including the renderer's current one
    in_flight: usize,
    capacity: usize,
}

/// Create both ends of the plan queues. `initial` becomes the renderer's first plan.
pub(crate) fn queue(capacity: usize, initial: RenderPlan) -> (PlanPublisher, Renderer) {
    let (to_renderer, from_control) = RingBuffer::new(capacity);
    let (to_control, retired) = RingBuffer::new(capacity);

    let publisher = PlanPublisher {
        to_renderer,
        retired,
        held: None,
        in_flight: 1,
        capacity,
    };

    (publisher, Renderer::new(initial, from_control, to_control))
}

impl PlanPublisher {
    /// Hand `plan` to the renderer, or hold it back if too many are in flight.
    ///
    /// Keeping `in_flight` below the capacity of both queues means the
    /// renderer can always retire a plan without blocking or freeing it.
    pub(crate) fn publish(&mut self, plan: RenderPlan) {
        self.reclaim_retired();

        if self.in_flight >= self.capacity {
            warn!(version = plan.version, in_flight = self.in_flight, "renderer is behind, holding plan back");
            // An older held plan was never seen by the renderer, dropping it here is fine
            self.held = Some(plan);
            return;
        }

        // Superseded; flushing it later would roll the renderer back
        self.held = None;
        self.push(plan);
    }

    /// Drop retired plans and flush a held plan if there is room again.
    pub(crate) fn reclaim(&mut self) -> usize {
        let reclaimed = self.reclaim_retired();

        if self.in_flight < self.capacity {
            if let Some(plan) = self.held.take() {
                self.push(plan);
            }
        }

        reclaimed
    }

    fn reclaim_retired(&mut self) -> usize {
        let mut reclaimed = 0;
        while let Ok(plan) = self.retired.pop() {
            drop(plan);
            self.in_flight -= 1;
            reclaimed += 1;
        }
        reclaimed
    }

    fn push(&mut self, plan: RenderPlan) {
        match self.to_renderer.push(plan) {
            Ok(()) => self.in_flight += 1,
            Err(rtrb::PushError::Full(plan)) => self.held = Some(plan),
        }
    }
}
