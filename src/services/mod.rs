pub mod accounts;
pub mod applications;
pub mod identity_provider;
pub mod internships;
pub mod notification;
