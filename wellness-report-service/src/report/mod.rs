pub mod fallback;
pub mod generator;
pub mod prompt;
pub mod schema;

pub use fallback::FallbackReportBuilder;
pub use generator::{DisabledGenerator, GenerationError, OpenRouterGenerator, ReportGenerator};
pub use prompt::build_generation_prompt;
pub use schema::{REPORT_SCHEMA_VERSION, ReportData};
