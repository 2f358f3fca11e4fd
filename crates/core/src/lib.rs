//! # nidata Core
//!
//! Data-access adapters for neuroimaging processing:
//! - Template expansion and globbing of file patterns
//! - Subject directory location and FreeSurfer output discovery
//! - Per-subject run aggregation and template-driven grabbing
//! - Hierarchical deposit of produced files
//! - Argument metadata for wrapped command-line tools
//!
//! **No environment access**: the binary reads `SUBJECTS_DIR` and passes it in through
//! [`config::resolve_subjects_dir`].

pub mod config;
pub mod constants;
pub mod conventions;
pub mod datagrabber;
pub mod datasink;
pub mod datasource;
mod error;
pub mod freesurfer;
pub mod interfaces;
pub mod outputs;
pub mod subject;
pub mod template;

pub use datagrabber::{DataGrabber, DataGrabberOutputs};
pub use datasink::{DataSink, DepositReport, DepositSpec};
pub use datasource::{DataSource, DataSourceOutputs, RunGroup, SubjectInfo};
pub use error::{SourceError, SourceResult};
pub use freesurfer::FreeSurferSource;
pub use outputs::{ResolvedOutputSet, ResolvedPaths};
pub use template::TemplateArg;
