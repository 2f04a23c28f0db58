use log::SetLoggerError;

/// Attempt to init a env_logger for the region bookkeeping core.
/// Does nothing if the "builtin_env_logger" feature is disabled.
///
/// A runtime that already installed its own `log` implementation can skip this call,
/// or disable the default feature to remove `env_logger` from the dependencies.
pub fn try_init() -> Result<(), SetLoggerError> {
    cfg_if::cfg_if! {
        if #[cfg(feature = "builtin_env_logger")] {
            env_logger::try_init_from_env(
                // By default, use info level logging.
                env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
            )
        } else {
            Ok(())
        }
    }
}
