pub mod decoder;
pub mod engine;
pub mod mixer;
pub mod reporter;
pub mod sink;
pub mod store;
pub mod types;

pub use decoder::decode_file;
pub use engine::{Player, Transport};
pub use reporter::PositionCallback;
pub use sink::{AudioSink, CpalSink, OutputStream, RenderFn, StreamSpec};
pub use store::{PlayerState, TrackState};
pub use types::{AudioBuffer, PositionReport, TrackId, TrackInfo, TrackMode};
