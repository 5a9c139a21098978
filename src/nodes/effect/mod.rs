//! Audio effect stages (processors that rewrite their input in place)

mod filter;
mod gain;
mod pass_through;

pub use filter::Filter;
pub use gain::Gain;
pub use pass_through::PassThrough;
