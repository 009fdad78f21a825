pub mod fields;
pub mod identity;
pub mod notification;
pub mod password;
pub mod profile;
pub mod review;
