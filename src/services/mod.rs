// Services module - Business logic

pub mod auth_admin;
pub mod credits;
pub mod email;
pub mod invite_codes;
pub mod usage_logs;
pub mod users;
