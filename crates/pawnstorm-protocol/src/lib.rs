mod gamelog;
mod grid;
mod ids;
mod message;
mod units;
pub mod wire;

pub use crate::gamelog::*;
pub use crate::grid::*;
pub use crate::ids::*;
pub use crate::message::*;
pub use crate::units::*;
