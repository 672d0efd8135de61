pub mod applications;
pub mod auth;
pub mod employers;
pub mod internships;
pub mod students;
