//! Per-request pipeline stages, in the order the handler runs them.

pub mod history;
pub mod invoke;
pub mod normalize;
pub mod signature;
pub mod translate;

pub use history::{ValidatedHistory, validate};
pub use invoke::{Invocation, invoke};
pub use normalize::normalize;
pub use signature::verify;
pub use translate::{prompt_turn, translate};
