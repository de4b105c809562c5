pub mod auth;
pub mod bookings;
pub mod calendar;
pub mod imams;
pub mod metrics;
pub mod quota;
pub mod schedule;
pub mod settings;
