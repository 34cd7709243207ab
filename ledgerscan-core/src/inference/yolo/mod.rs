pub mod model;
pub mod session;

pub use model::{YoloTable, YoloTableConfig};
pub use session::YoloTableSession;
