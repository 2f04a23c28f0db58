/// log2 of the number of bits in a byte
pub const LOG_BITS_IN_BYTE: u8 = 3;
/// The number of bits in a byte
pub const BITS_IN_BYTE: usize = 1 << LOG_BITS_IN_BYTE;

/// log2 of the number of bytes in a megabyte
pub const LOG_BYTES_IN_MBYTE: u8 = 20;
/// The number of bytes in a megabyte
pub const BYTES_IN_MBYTE: usize = 1 << LOG_BYTES_IN_MBYTE;

/// log2 of the number of bytes in a kilobyte
pub const LOG_BYTES_IN_KBYTE: u8 = 10;
/// The number of bytes in a kilobyte
pub const BYTES_IN_KBYTE: usize = 1 << LOG_BYTES_IN_KBYTE;

#[cfg(target_pointer_width = "32")]
/// log2 of the number of bytes in an address
pub const LOG_BYTES_IN_ADDRESS: u8 = 2;
#[cfg(target_pointer_width = "64")]
/// log2 of the number of bytes in an address
pub const LOG_BYTES_IN_ADDRESS: u8 = 3;
/// The number of bytes in an address
pub const BYTES_IN_ADDRESS: usize = 1 << LOG_BYTES_IN_ADDRESS;

/// log2 of the number of bytes in a word
pub const LOG_BYTES_IN_WORD: u8 = LOG_BYTES_IN_ADDRESS;
/// The number of bytes in a word
pub const BYTES_IN_WORD: usize = 1 << LOG_BYTES_IN_WORD;
/// log2 of the number of bits in a word
pub const LOG_BITS_IN_WORD: usize = LOG_BITS_IN_BYTE as usize + LOG_BYTES_IN_WORD as usize;
/// The number of bits in a word
pub const BITS_IN_WORD: usize = 1 << LOG_BITS_IN_WORD;

/// log2 of the number of bytes in a page
pub const LOG_BYTES_IN_PAGE: u8 = 12;
/// The number of bytes in a page
pub const BYTES_IN_PAGE: usize = 1 << LOG_BYTES_IN_PAGE;

/// log2 of the smallest region (grain) size accepted by the default configuration (1 MiB).
pub const LOG_MIN_GRAIN_BYTES: u8 = LOG_BYTES_IN_MBYTE;
/// The smallest region size accepted by the default configuration.
pub const MIN_GRAIN_BYTES: usize = 1 << LOG_MIN_GRAIN_BYTES;
/// log2 of the largest region (grain) size (32 MiB).
pub const LOG_MAX_GRAIN_BYTES: u8 = LOG_BYTES_IN_MBYTE + 5;
/// The largest region size.
pub const MAX_GRAIN_BYTES: usize = 1 << LOG_MAX_GRAIN_BYTES;
/// The default region size.
pub const DEFAULT_GRAIN_BYTES: usize = BYTES_IN_MBYTE;

#[cfg(target_pointer_width = "32")]
/// The default base address of the reserved heap.
pub const DEFAULT_HEAP_BASE: usize = 0x4000_0000;
#[cfg(target_pointer_width = "64")]
/// The default base address of the reserved heap.
pub const DEFAULT_HEAP_BASE: usize = 0x2000_0000_0000;
/// The default number of regions committed at start-up.
pub const DEFAULT_INITIAL_REGIONS: usize = 64;
/// The default number of regions reserved.
pub const DEFAULT_MAX_REGIONS: usize = 2048;

static_assertions::const_assert!(MIN_GRAIN_BYTES.is_power_of_two());
static_assertions::const_assert!(MAX_GRAIN_BYTES.is_power_of_two());
static_assertions::const_assert!(DEFAULT_GRAIN_BYTES >= MIN_GRAIN_BYTES);
static_assertions::const_assert!(DEFAULT_INITIAL_REGIONS <= DEFAULT_MAX_REGIONS);
