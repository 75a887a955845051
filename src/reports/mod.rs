pub mod formatters;
pub mod generator;
pub mod writer;

pub use formatters::{JsonFormatter, MarkdownFormatter, ReportFormatter, TextFormatter};
pub use generator::ReportGenerator;
pub use writer::ReportWriter;
