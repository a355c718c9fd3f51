pub mod memory;
pub mod session;
pub mod subject;

pub use memory::InMemoryStore;
pub use session::PostgresSessionRepository;
pub use subject::PostgresSubjectRepository;
