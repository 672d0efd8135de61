pub mod application;
pub mod employer;
pub mod internship;
pub mod session;
pub mod student;
