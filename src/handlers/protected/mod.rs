pub mod appointments;
pub mod auth;
pub mod caregivers;
pub mod dashboard;
pub mod elders;
pub mod invites;
pub mod notes;
