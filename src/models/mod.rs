// Models module - Database row representations

pub mod credit;
pub mod invite_code;
pub mod usage_log;
pub mod user_profile;
pub mod waitlist;

pub use credit::{CreditBalance, CreditPurchase};
pub use invite_code::{InviteCode, InviteCodeStats};
pub use usage_log::{UsageLogRow, UsageLogSummary};
pub use user_profile::{UserProfile, UserProfileView};
pub use waitlist::WaitlistEntry;
