pub mod memory;
pub mod pg;

pub use memory::{MemoryContractIndex, MemoryInvitationStore, MemoryUserDirectory};
pub use pg::{PgContractIndex, PgInvitationStore, PgUserDirectory, ensure_schema};
