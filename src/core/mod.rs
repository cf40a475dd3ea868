pub mod dispatcher;
pub mod encoders;
pub mod export;
pub mod filename;
pub mod normalize;
pub mod projection;
pub mod roles;
pub mod selector;
pub mod session;

pub use crate::domain::model::{ExportArtifact, Notice, Row, RowId, Table};
pub use crate::domain::ports::{CursorSink, Encoder, RecordSource, Storage};
pub use crate::utils::error::Result;
