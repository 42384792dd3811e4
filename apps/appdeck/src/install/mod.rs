//! Download, integrate and register bundles.

pub mod desktop_entry;
pub mod download;
pub mod fetch;
pub mod integrate;
pub mod pipeline;
pub mod progress;

pub use integrate::Integrator;
pub use pipeline::{Installable, Installer};
