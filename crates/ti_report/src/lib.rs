//! Report generation: the sequential trend-to-report pipeline plus the
//! export and delivery surfaces around it.

pub mod export;
pub mod mail;
pub mod pipeline;
pub mod sheet;

pub use export::{articles_to_csv, articles_to_txt, report_filename};
pub use mail::{BodyFormat, EmailAttachment, Mailer};
pub use pipeline::{PipelineOptions, ReportPipeline, RunContext, TrendReport};
pub use sheet::{parse_report, rows_to_csv, ReportRow, RowKind};
