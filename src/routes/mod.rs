pub mod admin;
pub mod application;
pub mod auth;
pub mod company;
pub mod job;
pub mod recruiter;
pub mod upload;
