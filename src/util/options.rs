use crate::util::constants::*;
use crate::util::Address;
use std::default::Default;

fn always_valid<T>(_: &T) -> bool {
    true
}

fn is_valid_grain_bytes(v: &usize) -> bool {
    v.is_power_of_two() && (MIN_GRAIN_BYTES..=MAX_GRAIN_BYTES).contains(v)
}

fn is_valid_heap_base(v: &Address) -> bool {
    !v.is_zero() && v.is_aligned_to(MAX_GRAIN_BYTES)
}

macro_rules! options {
    ($($name:ident: $type:ty[$validator:expr] = $default:expr),*,) => [
        options!($($name: $type[$validator] = $default),*);
    ];
    ($($name:ident: $type:ty[$validator:expr] = $default:expr),*) => [
        /// Configuration of the region heap. Every option has a validator and a default.
        #[derive(Clone, Debug)]
        pub struct Options {
            $(pub $name: $type),*
        }
        impl Options {
            /// Set an option from its snake-case name and a string value. Returns `true` if the
            /// value was parsed and passed validation; otherwise the option is left unchanged.
            pub fn set_from_str(&mut self, s: &str, val: &str) -> bool {
                match s {
                    // Parse the given value from str (by env vars or by calling process()) to the right type
                    $(stringify!($name) => if let Ok(ref val) = val.parse::<$type>() {
                        // Validate
                        let validate_fn = $validator;
                        let is_valid = validate_fn(val);
                        if is_valid {
                            // Only set value if valid.
                            self.$name = val.clone();
                        } else {
                            warn!("Unable to set {}={:?}. Invalid value. Default value will be used.", s, val);
                        }
                        is_valid
                    } else {
                        warn!("Unable to set {}={:?}. Cant parse value. Default value will be used.", s, val);
                        false
                    })*
                    _ => {
                        warn!("Unknown option {}={:?}. Ignored.", s, val);
                        false
                    }
                }
            }

            /// Check every option against its validator.
            pub fn is_valid(&self) -> bool {
                true $(&& {
                    let validate_fn = $validator;
                    validate_fn(&self.$name)
                })*
            }

            /// Read options from environment variables, and apply those settings to self.
            ///
            /// If we have environment variables that start with `G1_` and match any option
            /// (such as `G1_GRAIN_BYTES`), we set the option to its value (if it is a valid value).
            pub fn read_env_var_settings(&mut self) {
                const PREFIX: &str = "G1_";
                for (key, val) in std::env::vars() {
                    // strip the prefix, and get the lower case string
                    if let Some(rest_of_key) = key.strip_prefix(PREFIX) {
                        let lowercase: &str = &rest_of_key.to_lowercase();
                        match lowercase {
                            $(stringify!($name) => { self.set_from_str(lowercase, &val); },)*
                            _ => {}
                        }
                    }
                }
            }
        }
        impl Default for Options {
            fn default() -> Self {
                Options {
                    $($name: $default),*
                }
            }
        }
    ]
}

options! {
    // The start of the reserved heap. Region 0 begins here.
    heap_base:             Address              [is_valid_heap_base] = unsafe { Address::from_usize(DEFAULT_HEAP_BASE) },
    // The size of every region, in bytes. Must be a power of two between 1 MiB and 32 MiB.
    grain_bytes:           usize                [is_valid_grain_bytes] = DEFAULT_GRAIN_BYTES,
    // The number of regions committed when the heap is created.
    initial_regions:       usize                [always_valid] = DEFAULT_INITIAL_REGIONS,
    // The number of regions reserved. The heap never grows beyond this.
    max_regions:           usize                [|v: &usize| *v > 0] = DEFAULT_MAX_REGIONS,
    // Should a humongous allocation commit more regions when no contiguous free span exists?
    expand_on_humongous:   bool                 [always_valid] = true,
    // Should the monitoring snapshot be cross-checked against the regions after each refresh?
    verify_monitoring:     bool                 [always_valid] = cfg!(debug_assertions)
}

impl Options {
    /// Set an option from a camel-case name, such as `grainBytes`.
    pub fn set_from_camelcase_str(&mut self, s: &str, val: &str) -> bool {
        trace!("Trying to process option pair: ({}, {})", s, val);

        let mut sr = String::with_capacity(s.len());
        for c in s.chars() {
            if c.is_uppercase() {
                sr.push('_');
                for c in c.to_lowercase() {
                    sr.push(c);
                }
            } else {
                sr.push(c)
            }
        }

        let result = self.set_from_str(sr.as_str(), val);

        if result {
            trace!("Validation passed");
        } else {
            trace!("Validation failed")
        }
        result
    }

    /// The reserved heap size in bytes.
    pub fn max_heap_size(&self) -> usize {
        self.max_regions * self.grain_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_util::{serial_test, with_cleanup};

    #[test]
    fn no_env_var() {
        serial_test(|| {
            let mut options = Options::default();
            options.read_env_var_settings();
            assert_eq!(options.grain_bytes, DEFAULT_GRAIN_BYTES);
            assert_eq!(options.max_regions, DEFAULT_MAX_REGIONS);
            assert!(options.is_valid());
        })
    }

    #[test]
    fn with_valid_env_var() {
        serial_test(|| {
            with_cleanup(
                || {
                    std::env::set_var("G1_GRAIN_BYTES", "4194304");
                    std::env::set_var("G1_HEAP_BASE", "0x40000000");

                    let mut options = Options::default();
                    options.read_env_var_settings();
                    assert_eq!(options.grain_bytes, 4 * BYTES_IN_MBYTE);
                    assert_eq!(options.heap_base.as_usize(), 0x4000_0000);
                },
                || {
                    std::env::remove_var("G1_GRAIN_BYTES");
                    std::env::remove_var("G1_HEAP_BASE");
                },
            )
        })
    }

    #[test]
    fn with_invalid_env_var_value() {
        serial_test(|| {
            with_cleanup(
                || {
                    // 3 MiB is not a power of two
                    std::env::set_var("G1_GRAIN_BYTES", "3145728");

                    let mut options = Options::default();
                    options.read_env_var_settings();
                    assert_eq!(options.grain_bytes, DEFAULT_GRAIN_BYTES);
                },
                || {
                    std::env::remove_var("G1_GRAIN_BYTES");
                },
            )
        })
    }

    #[test]
    fn with_unparsable_env_var_value() {
        serial_test(|| {
            with_cleanup(
                || {
                    std::env::set_var("G1_MAX_REGIONS", "many");

                    let mut options = Options::default();
                    options.read_env_var_settings();
                    assert_eq!(options.max_regions, DEFAULT_MAX_REGIONS);
                },
                || {
                    std::env::remove_var("G1_MAX_REGIONS");
                },
            )
        })
    }

    #[test]
    fn camelcase_names() {
        let mut options = Options::default();
        assert!(options.set_from_camelcase_str("initialRegions", "8"));
        assert_eq!(options.initial_regions, 8);
        assert!(options.set_from_camelcase_str("expandOnHumongous", "false"));
        assert!(!options.expand_on_humongous);
        assert!(!options.set_from_camelcase_str("noSuchOption", "1"));
    }

    #[test]
    fn grain_bounds() {
        let mut options = Options::default();
        assert!(!options.set_from_str("grain_bytes", "524288"));
        assert!(!options.set_from_str("grain_bytes", &(64 * BYTES_IN_MBYTE).to_string()));
        assert!(options.set_from_str("grain_bytes", &(32 * BYTES_IN_MBYTE).to_string()));
        assert_eq!(options.max_heap_size(), DEFAULT_MAX_REGIONS * 32 * BYTES_IN_MBYTE);
    }
}
