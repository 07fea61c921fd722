pub mod classifier;
pub mod timestamp;
pub mod writer;

pub use writer::RunLog;
