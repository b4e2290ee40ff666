//! Shared models

mod error;
mod object_id;
mod op_time;

pub use error::{ErrorKind, IndexSyncError, Result};
pub use object_id::{ObjectId, ParseObjectIdError};
pub use op_time::OpTime;
