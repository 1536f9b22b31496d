mod framing;
pub mod messages;
mod session;

pub use framing::{decode_frame, encode_frame};
pub use messages::{DataType, Envelope, GroundSteeringRequest, TimeStamp};
pub use session::{Od4Session, OD4_PORT};
