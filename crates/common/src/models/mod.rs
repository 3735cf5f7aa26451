pub mod annotation;
pub mod history;
pub mod run_report;
pub mod signal;
pub mod ticker;

pub use annotation::{Annotation, AnnotationSource};
pub use history::{Bar, HistorySeries};
pub use run_report::RunReport;
pub use signal::{Signal, TrendKind};
pub use ticker::Ticker;
