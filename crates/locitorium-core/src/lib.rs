//! locitorium core: data model, configuration, error taxonomy and the
//! capability traits the resolution pipeline is written against.

pub mod capabilities;
pub mod config;
pub mod error;
#[cfg(feature = "testing")]
pub mod testing;
pub mod types;

pub use capabilities::{Gazetteer, LanguageModel};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use types::*;
