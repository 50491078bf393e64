//! Game logic.
//!
//! [`Engine`] is the full game; [`ScriptedGame`] is a stand-in with a known
//! outcome. Both implement [`Simulation`], the seam the coordinator evaluates
//! agents through.

pub use self::{game::*, moves::*, piece_bag::*, scripted::*, snapshot::*};

mod game;
mod moves;
mod piece_bag;
mod scripted;
mod snapshot;
