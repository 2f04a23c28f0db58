/// Address type and arithmetic.
pub mod address;
/// Size and layout constants.
pub mod constants;
/// Alignment and region/byte conversions.
pub mod conversions;
/// The built-in `env_logger` setup.
pub mod logger;
/// Heap options and their validators.
pub mod options;

#[cfg(any(test, feature = "test_private"))]
pub mod test_util;

pub use self::address::Address;
