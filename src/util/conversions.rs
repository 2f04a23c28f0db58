use crate::util::constants::*;

/* Alignment */

pub const fn raw_is_aligned(val: usize, align: usize) -> bool {
    val & align.wrapping_sub(1) == 0
}

/* Conversion */

/// log2 of a power-of-two size. The caller must pass a power of two.
pub const fn log2_of_power_of_two(bytes: usize) -> usize {
    debug_assert!(bytes.is_power_of_two());
    bytes.trailing_zeros() as usize
}

/// The number of regions of `grain_bytes` needed to hold `bytes`.
pub const fn bytes_to_regions_up(bytes: usize, log_grain_bytes: usize) -> usize {
    let mask = (1 << log_grain_bytes) - 1;
    (bytes >> log_grain_bytes) + (bytes & mask != 0) as usize
}

pub const fn regions_to_bytes(regions: usize, log_grain_bytes: usize) -> usize {
    regions << log_grain_bytes
}

pub fn bytes_to_formatted_string(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut i = 0;
    let mut num = bytes;
    while i < UNITS.len() - 1 {
        let new_num = num >> LOG_BYTES_IN_KBYTE;
        if new_num == 0 || num & (BYTES_IN_KBYTE - 1) != 0 {
            break;
        }
        num = new_num;
        i += 1;
    }
    format!("{}{}", num, UNITS[i])
}
