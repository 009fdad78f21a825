pub mod config;
pub mod domain;
pub mod inbound;
pub mod outbound;

pub use domain::identity;
pub use domain::password;
pub use domain::profile;
pub use outbound::repositories;
