pub mod auth;
pub mod bookings;
pub mod health;
pub mod imams;
pub mod metrics;
pub mod schedule;
pub mod settings;
