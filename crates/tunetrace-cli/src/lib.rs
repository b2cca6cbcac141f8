//! Shared plumbing of the TuneTrace command line tools

pub mod audio;
pub mod output;

/// Route log output to stderr at `Info` when verbose, silence it otherwise,
/// so stdout carries nothing but JSON
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Off
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}
