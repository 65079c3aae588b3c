#![doc = include_str!("../README.md")]

mod chunk;
mod collection;
mod dataset;
mod error;
pub mod memory;
mod merge;
mod params;
mod resolver;
mod runtime;
mod state;
mod status;
mod watcher;

pub use crate::chunk::*;
pub use crate::collection::*;
pub use crate::dataset::*;
pub use crate::error::*;
pub use crate::merge::*;
pub use crate::params::*;
pub use crate::resolver::*;
pub use crate::state::*;
pub use crate::status::*;
pub use crate::watcher::*;
