//! Deterministic falling-block game used as the fitness environment.
//!
//! - [`core`] holds the static data: piece shapes, rotation states, wall-kick
//!   tables and the cell grid.
//! - [`engine`] holds the game logic: the [`Engine`] state machine, the 7-bag
//!   [`PieceBag`], move handling and the [`Snapshot`]/[`Simulation`] seams used by
//!   the round coordinator.
//!
//! # Example
//!
//! ```
//! use tetrevo_engine::{Engine, Move};
//!
//! let mut engine = Engine::new(10, 20);
//! engine.apply_move(Move::Left);
//! engine.apply_move(Move::RotateCw);
//! let reward = engine.tick();
//! assert_eq!(reward, 0);
//! assert!(!engine.is_game_over());
//! ```

pub use self::{core::*, engine::*};

pub mod core;
pub mod engine;
