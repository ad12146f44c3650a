mod filename;
mod session;
mod store;
mod template;
mod types;
mod work;

pub use filename::upload_filename;
pub use session::{FormSession, UploadBatch};
pub use store::*;
pub use template::*;
pub use types::*;
pub use work::{ImageAsset, WorkItem, WorkQueue};
