#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for Critter Defence.
//!
//! [`CritterManager`] and [`TowerManager`] own the live entities and are the
//! only code allowed to create or destroy them. Both are shared as `Rc`
//! handles and expose `&self` APIs so observers reacting to their deltas can
//! read them freely while structural mutation stays guarded.

mod critters;
mod economy;
mod map;
mod navigation;
mod towers;

pub use critters::{Critter, CritterManager, CritterSpec, CritterState, SlowDebuff, FULL_SPEED};
pub use economy::{Economy, Purse, SharedEconomy};
pub use map::MapGrid;
pub use navigation::{BreadthFirst, Pathfinder};
pub use towers::{Tower, TowerManager, TowerSpec, UPGRADE_POWER_BONUS, UPGRADE_RANGE_BONUS};
