//! Low-level PDF access and the layout decoder built on it.

pub mod backend;
pub mod layout;
