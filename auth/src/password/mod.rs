pub mod argon2;
pub mod errors;
pub mod policy;
pub mod secret;

pub use argon2::PasswordHasher;
pub use errors::PasswordError;
pub use errors::PolicyViolation;
pub use policy::PasswordPolicy;
pub use secret::generate_secret;
