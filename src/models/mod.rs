pub mod admin;
pub mod booking;
pub mod imam;
pub mod schedule;
pub mod settings;
