pub const DEFAULT_RESET_THRESHOLD: i32 = 64; // Default RESET value as defined in ISO/IEC 14495-1, table C.2

pub const MINIMUM_COMPONENT_COUNT: i32 = 1;
pub const MAXIMUM_COMPONENT_COUNT: i32 = 255;
pub const MINIMUM_BITS_PER_SAMPLE: i32 = 2;
pub const MAXIMUM_BITS_PER_SAMPLE: i32 = 16;
pub const MAXIMUM_WIDTH: u32 = 65535;
pub const MAXIMUM_HEIGHT: u32 = 65535;
pub const MAXIMUM_NEAR_LOSSLESS: i32 = 255;

pub const CONTEXT_COUNT: usize = 365;
pub const RUN_MODE_CONTEXT_COUNT: usize = 2;

// Upper bound for the Golomb coding parameter search. A stream that drives
// the search to this bound is malformed.
pub const MAX_K_VALUE: i32 = 32;

// Number of short-code lookup tables; symbols coded with k at or above this
// always take the generic decode path.
pub const SHORT_CODE_TABLE_COUNT: usize = 16;

// Order-3 run-length code specifiers as defined in ISO/IEC 14495-1, table A.2.
pub const J: [i32; 32] = [
    0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 9, 10, 11, 12, 13,
    14, 15,
];
