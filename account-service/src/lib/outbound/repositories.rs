pub mod identity;
pub mod profile;
pub mod reset_ticket;
pub mod session;

pub use identity::PostgresIdentityRepository;
pub use profile::PostgresProfileRepository;
pub use reset_ticket::PostgresResetTicketRepository;
pub use session::PostgresSessionStore;
