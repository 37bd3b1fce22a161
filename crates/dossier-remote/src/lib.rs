pub mod generator;
pub mod sink;

pub use generator::HttpGenerator;
pub use sink::HttpSink;
