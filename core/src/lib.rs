pub mod auth;
pub mod error;
pub mod guarantees;
pub mod moderation;
pub mod onboarding;
pub mod plans;
pub mod profiles;
pub mod referrals;
pub mod subscriptions;
