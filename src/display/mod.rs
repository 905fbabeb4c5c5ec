pub mod clock;
pub mod terminal;

use std::path::PathBuf;

/// Runtime options that come from the command line rather than the config file
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Replace the microphone with a synthetic signal
    pub demo: bool,
    /// Where `w` and the `save` command persist the current mode
    pub config_path: Option<PathBuf>,
}
