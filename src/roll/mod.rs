mod ctx;
mod pool;
mod result;
mod source;

pub use ctx::{EvalContext, DEFAULT_ROLL_BUDGET};
pub use result::{Breakdown, DiceResult, ExplodedDie, ResultKind, TaggedDieResult};
pub use source::{RandomSource, ReplaySource};
