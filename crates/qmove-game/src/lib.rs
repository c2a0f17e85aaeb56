#![allow(clippy::needless_range_loop, clippy::float_cmp)]

pub mod physics;
pub mod pmove;
pub mod g_main;
