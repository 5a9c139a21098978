use crate::node::{ProcessBlock, ProcessContext, Stage};

/// Leaves audio and events exactly as gathered.
#[derive(Clone, Copy, Default, Debug)]
pub struct PassThrough;

impl Stage for PassThrough {
    fn name(&self) -> &'static str {
        "Pass Through"
    }

    #[inline]
    fn process(&mut self, _ctx: &ProcessContext, _block: ProcessBlock<'_>) {}
}
