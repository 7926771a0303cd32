pub mod example;
pub mod reader;

pub use example::Example;
pub use reader::{read_example, read_metadata, DatasetMetadata, JsonExampleReader};
