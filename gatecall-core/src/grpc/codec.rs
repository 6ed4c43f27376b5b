//! # Dynamic Message Codec
//!
//! This module implements `tonic::codec::Codec` so `tonic` can transport
//! `prost_reflect::DynamicMessage` values directly, without generated Rust structs.
//!
//! ## How it works
//!
//! 1. **Encoder**:
//!    - Checks that the outgoing message has the request shape of the method.
//!    - Serializes it into the gRPC byte buffer.
//!
//! 2. **Decoder**:
//!    - Reads raw bytes from the wire.
//!    - Decodes them into a `DynamicMessage` of the response shape.
use prost::Message;
use prost_reflect::{DynamicMessage, MessageDescriptor, ReflectMessage};
use tonic::{
    Status,
    codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder},
};

/// A Codec that (de)serializes `DynamicMessage` values using runtime descriptors.
#[derive(Debug, Clone)]
pub struct DynamicCodec {
    /// Schema for the input message.
    req_desc: MessageDescriptor,
    /// Schema for the output message.
    res_desc: MessageDescriptor,
}

impl DynamicCodec {
    pub fn new(req_desc: MessageDescriptor, res_desc: MessageDescriptor) -> Self {
        Self { req_desc, res_desc }
    }
}

impl Codec for DynamicCodec {
    type Encode = DynamicMessage;
    type Decode = DynamicMessage;

    type Encoder = DynamicEncoder;
    type Decoder = DynamicDecoder;

    fn encoder(&mut self) -> Self::Encoder {
        DynamicEncoder(self.req_desc.clone())
    }

    fn decoder(&mut self) -> Self::Decoder {
        DynamicDecoder(self.res_desc.clone())
    }
}

/// Responsible for encoding a request message into Protobuf bytes.
pub struct DynamicEncoder(MessageDescriptor);

impl Encoder for DynamicEncoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        check_shape(&self.0, &item)?;
        item.encode_raw(dst);
        Ok(())
    }
}

fn check_shape(expected: &MessageDescriptor, item: &DynamicMessage) -> Result<(), Status> {
    let actual = item.descriptor();
    if actual != *expected {
        return Err(Status::internal(format!(
            "Request message '{}' does not match the method input '{}'",
            actual.full_name(),
            expected.full_name()
        )));
    }
    Ok(())
}

/// Responsible for decoding Protobuf bytes into a response message.
pub struct DynamicDecoder(MessageDescriptor);

impl Decoder for DynamicDecoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        let mut msg = DynamicMessage::new(self.0.clone());
        msg.merge(src)
            .map_err(|e| Status::internal(format!("Failed to decode Protobuf bytes: {}", e)))?;

        Ok(Some(msg))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{greeter_pool, reply, request};

    #[test]
    fn test_check_shape() {
        let pool = greeter_pool();
        let input = pool.get_message_by_name("greeter.HelloRequest").unwrap();

        assert!(check_shape(&input, &request(&pool, "world")).is_ok());

        let status = check_shape(&input, &reply(&pool, "wrong shape")).unwrap_err();
        assert_eq!(status.code(), tonic::Code::Internal);
        assert!(status.message().contains("greeter.HelloReply"));
    }
}
