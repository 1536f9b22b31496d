use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Ok};
use prost::Message;

/// Message types that can travel inside an [`Envelope`].
pub trait DataType: Message + Default {
    const ID: i32;
}

#[derive(Clone, Copy, PartialEq, Message)]
pub struct TimeStamp {
    #[prost(sint32, tag = "1")]
    pub seconds: i32,
    #[prost(sint32, tag = "2")]
    pub microseconds: i32,
}

impl TimeStamp {
    pub fn now() -> Self {
        let since_epoch = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        Self::from_micros(since_epoch.as_micros() as i64)
    }

    pub fn from_micros(micros: i64) -> Self {
        Self {
            seconds: (micros / 1_000_000) as i32,
            microseconds: (micros % 1_000_000) as i32,
        }
    }

    pub fn to_micros(&self) -> i64 {
        self.seconds as i64 * 1_000_000 + self.microseconds as i64
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct Envelope {
    #[prost(sint32, tag = "1")]
    pub data_type: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub serialized_data: Vec<u8>,
    #[prost(message, optional, tag = "3")]
    pub sent: Option<TimeStamp>,
    #[prost(message, optional, tag = "4")]
    pub received: Option<TimeStamp>,
    #[prost(message, optional, tag = "5")]
    pub sample_time_stamp: Option<TimeStamp>,
    #[prost(uint32, tag = "6")]
    pub sender_stamp: u32,
}

impl Envelope {
    pub fn wrap<M: DataType>(message: &M, sample_time: TimeStamp, sender_stamp: u32) -> Self {
        Self {
            data_type: M::ID,
            serialized_data: message.encode_to_vec(),
            sent: Some(TimeStamp::now()),
            received: None,
            sample_time_stamp: Some(sample_time),
            sender_stamp,
        }
    }

    pub fn unpack<M: DataType>(&self) -> anyhow::Result<M> {
        if self.data_type != M::ID {
            return Err(anyhow!("Envelope carries data type {}, expected {}", self.data_type, M::ID));
        }

        Ok(M::decode(self.serialized_data.as_slice())?)
    }
}

/// Steering angle the vehicle was actually driven with.
#[derive(Clone, Copy, PartialEq, Message)]
pub struct GroundSteeringRequest {
    #[prost(float, tag = "1")]
    pub ground_steering: f32,
}

impl DataType for GroundSteeringRequest {
    const ID: i32 = 1090;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_is_zigzag_encoded() {
        let envelope = Envelope { data_type: GroundSteeringRequest::ID, ..Default::default() };
        // zigzag(1090) = 2180
        assert_eq!(envelope.encode_to_vec(), vec![0x08, 0x84, 0x11]);
    }

    #[test]
    fn unpack_checks_data_type() {
        let request = GroundSteeringRequest { ground_steering: -0.12 };
        let mut envelope = Envelope::wrap(&request, TimeStamp::from_micros(5), 0);
        assert_eq!(envelope.unpack::<GroundSteeringRequest>().unwrap(), request);

        envelope.data_type = 1041;
        assert!(envelope.unpack::<GroundSteeringRequest>().is_err());
    }

    #[test]
    fn timestamp_splits_microseconds() {
        let stamp = TimeStamp::from_micros(1_600_000_123_456_789);
        assert_eq!(stamp.seconds, 1_600_000_123);
        assert_eq!(stamp.microseconds, 456_789);
        assert_eq!(stamp.to_micros(), 1_600_000_123_456_789);
    }
}
