pub mod application;
pub mod credential;
pub mod job;
pub mod user;
