use std::default::Default;
use std::fmt;
use std::str::FromStr;

/// Number of GC threads of each kind.
///
/// The format is
/// ```text
/// <threads> ::= <parallel> | <parallel> "," <concurrent>
/// ```
/// When only the parallel count is given, one concurrent thread is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadCounts {
    pub parallel: usize,
    pub concurrent: usize,
}

impl ThreadCounts {
    pub const DEFAULT_CONCURRENT: usize = 1;

    pub const fn new(parallel: usize, concurrent: usize) -> Self {
        Self {
            parallel,
            concurrent,
        }
    }

    pub fn total(&self) -> usize {
        self.parallel + self.concurrent
    }

    /// At least one parallel worker, and a total that fits in a `usize`.  Marking and sweep
    /// requests are never serviced without parallel workers.
    pub fn is_valid(&self) -> bool {
        self.parallel >= 1 && self.parallel.checked_add(self.concurrent).is_some()
    }
}

impl Default for ThreadCounts {
    fn default() -> Self {
        Self::new(
            usize::max(1, num_cpus::get() / 2),
            Self::DEFAULT_CONCURRENT,
        )
    }
}

impl FromStr for ThreadCounts {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |v: &str| {
            v.trim()
                .parse::<usize>()
                .map_err(|_| format!("Failed to parse thread count {:?}", v))
        };
        match s.split_once(',') {
            Some((parallel, concurrent)) => Ok(Self::new(parse(parallel)?, parse(concurrent)?)),
            None => Ok(Self::new(parse(s)?, Self::DEFAULT_CONCURRENT)),
        }
    }
}

impl fmt::Display for ThreadCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.parallel, self.concurrent)
    }
}

macro_rules! options {
    ($($name:ident: $type:ty[$validator:expr] = $default:expr),*,) => [
        options!($($name: $type[$validator] = $default),*);
    ];
    ($($name:ident: $type:ty[$validator:expr] = $default:expr),*) => [
        #[derive(Debug, Clone)]
        pub struct Options {
            $(pub $name: $type),*
        }
        impl Options {
            /// Set an option by name.  Returns true if the value was parsed and is valid.
            #[allow(irrefutable_let_patterns)] // String options always parse.
            pub fn set_from_str(&mut self, s: &str, val: &str) -> bool {
                match s {
                    // Parse the given value from str (by env vars or by calling set_from_str()) to the right type
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
                    _ => panic!("Invalid Options key: {}", s)
                }
            }

            /// Options with their default values, ignoring environment variables.
            pub fn builtin_defaults() -> Self {
                Options {
                    $($name: $default),*
                }
            }
        }
        impl Default for Options {
            fn default() -> Self {
                let mut options = Self::builtin_defaults();

                // If we have env vars that start with GC_ and match any option (such as GC_THREADS),
                // we set the option to its value (if it is a valid value). Otherwise, use the default value.
                const PREFIX: &str = "GC_";
                for (key, val) in std::env::vars() {
                    // strip the prefix, and get the lower case string
                    if let Some(rest_of_key) = key.strip_prefix(PREFIX) {
                        let lowercase: &str = &rest_of_key.to_lowercase();
                        match lowercase {
                            $(stringify!($name) => { options.set_from_str(lowercase, &val); },)*
                            _ => {}
                        }
                    }
                }
                options
            }
        }
    ]
}
options! {
    // Number of parallel and concurrent GC threads, as "P" or "P,C".
    threads:            ThreadCounts [ThreadCounts::is_valid] = ThreadCounts::default(),
    // Stack size in bytes for GC threads spawned by the default spawner. 0 uses the platform default.
    stack_size:         usize        [|v: &usize| *v == 0 || *v >= MIN_STACK_SIZE] = 0,
    // Prefix of GC thread names, e.g. "gc" gives "gc-parallel-0".
    thread_name_prefix: String       [|v: &String| !v.is_empty()] = "gc".to_string(),
}

/// Smallest non-default stack size accepted for GC threads.
pub const MIN_STACK_SIZE: usize = 64 << 10;
