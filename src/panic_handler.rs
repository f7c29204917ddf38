use log::error;
use std::panic;

/// Debug builds get `better-panic` backtraces, release builds a
/// `human-panic` crash report. Either way the panic is logged first so it
/// lands in the log file too.
pub fn initialize_panic_handler() {
    #[cfg(debug_assertions)]
    better_panic::install();

    #[cfg(not(debug_assertions))]
    human_panic::setup_panic!();

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        error!("{panic_info}");
        default_hook(panic_info);
    }));
}
