//! UI module root: exposes drawing functions for the status panel.

pub mod status;
pub mod util;
