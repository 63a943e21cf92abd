pub mod checkout_sessions;
pub mod cleanup;
pub mod pricing;
