//! Configuration loading and management

mod loader;

pub use loader::{
    BuildConfig, CommandLine, ExtperfConfig, ExtperfConfigFile, MeasureConfig, CONFIG_FILE_NAMES,
};
