pub mod identifier;
pub mod ids;
pub mod jid;
pub mod phone;

pub use identifier::{Candidate, CandidateSource, Confidence, Identifier};
pub use ids::CycleId;
pub use jid::{is_masked_jid, jid_phone_digits, loose_jid_digits, path_digits, LID_MARKER};
pub use phone::{has_min_length, only_digits, NumberPlan, MIN_DIGITS};
