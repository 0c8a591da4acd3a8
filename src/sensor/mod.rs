//! Everything between the serial cable and a `PunchEvent`.

pub mod evaluator;
pub mod frame;
pub mod ingest;
pub mod link;

pub use evaluator::{Evaluation, ForceEvaluator};
pub use frame::{parse_line, SensorFrame};
pub use ingest::{spawn_ingest, IngestExit, IngestSettings, SensorStatus, SensorStatusCell};
pub use link::{SensorConnector, SensorLink, SerialConnector};
