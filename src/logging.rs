//! Logger setup.
//!
//! Android routes `log` output to logcat; everywhere else `env_logger`
//! reads `RUST_LOG`. Safe to call more than once.

pub const LOG_TAG: &str = "navbridge";

#[cfg(target_os = "android")]
pub fn init() {
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Debug)
            .with_tag(LOG_TAG),
    );
}

#[cfg(not(target_os = "android"))]
pub fn init() {
    let _ = env_logger::try_init();
}
