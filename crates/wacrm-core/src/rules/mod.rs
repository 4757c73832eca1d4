pub mod dedup;
pub mod policy;

pub use dedup::{validate_suffix_len, SuffixDedup, DEFAULT_SUFFIX_LEN, MIN_SUFFIX_LEN};
pub use policy::{DrawerClosePolicy, MatchPolicy};
