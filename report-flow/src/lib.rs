pub mod error;
pub mod queue;
pub mod session;
pub mod storage;
pub mod storage_postgres;

// Re-export commonly used types
pub use error::{FlowError, Result};
pub use queue::GenerationQueue;
pub use session::{
    ClientErrorRecord, PaymentStatus, PhotoAnalysis, PlanType, ReportStatus, SessionPatch,
    SessionRecord, SkinStatus, now_rfc3339,
};
pub use storage::{InMemorySessionStore, SessionStore};
pub use storage_postgres::PostgresSessionStore;
