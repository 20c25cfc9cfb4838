pub mod clients;
pub mod components;
pub mod schedule_wizard;
pub mod trainers;
