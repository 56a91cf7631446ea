//! Logging utilities


use env_logger::Env;


#[cfg(debug_assertions)]
const DEFAULT_FILTER: &str = "info,speedcam=debug";
#[cfg(not(debug_assertions))]
const DEFAULT_FILTER: &str = "info";


/// Initializes environment-based logging provider
///
/// The filter is read from `SC_LOG` and the write style from `SC_LOG_STYLE`.
pub fn init() {

    let env = Env::default()
        .filter_or("SC_LOG", DEFAULT_FILTER)
        .write_style("SC_LOG_STYLE");

    env_logger::init_from_env(env);
}
