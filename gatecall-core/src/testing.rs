//! Shared fixtures for unit tests: a `greeter.Greeter` schema built by hand (no `protoc`
//! needed) and a scripted in-memory [`Transport`].
use crate::{
    message::{CallType, MethodSignature},
    observer::BoxObserver,
    transport::{CallOptions, RequestSender, RequestStream, Transport},
};
use prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor, Value};
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
    MethodDescriptorProto, ServiceDescriptorProto,
    field_descriptor_proto::{Label, Type},
};
use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};
use tokio_stream::StreamExt;
use tonic::Status;

fn string_message(name: &str, field: &str) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: vec![FieldDescriptorProto {
            name: Some(field.to_string()),
            json_name: Some(field.to_string()),
            number: Some(1),
            label: Some(Label::Optional as i32),
            r#type: Some(Type::String as i32),
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn method(name: &str, client_streaming: bool, server_streaming: bool) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(".greeter.HelloRequest".to_string()),
        output_type: Some(".greeter.HelloReply".to_string()),
        client_streaming: Some(client_streaming),
        server_streaming: Some(server_streaming),
        ..Default::default()
    }
}

/// Same schema as `greeter-service/proto/greeter.proto`.
pub fn greeter_pool() -> DescriptorPool {
    let file = FileDescriptorProto {
        name: Some("greeter.proto".to_string()),
        package: Some("greeter".to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![
            string_message("HelloRequest", "name"),
            string_message("HelloReply", "message"),
        ],
        service: vec![ServiceDescriptorProto {
            name: Some("Greeter".to_string()),
            method: vec![
                method("SayHello", false, false),
                method("StreamHellos", false, true),
                method("CollectHellos", true, false),
                method("ChatHellos", true, true),
                method("Unavailable", false, false),
            ],
            ..Default::default()
        }],
        ..Default::default()
    };

    DescriptorPool::from_file_descriptor_set(FileDescriptorSet { file: vec![file] })
        .expect("valid greeter schema")
}

fn message(pool: &DescriptorPool, name: &str, field: &str, value: &str) -> DynamicMessage {
    let descriptor = pool.get_message_by_name(name).expect("message exists");
    let mut message = DynamicMessage::new(descriptor);
    message.set_field_by_name(field, Value::String(value.to_string()));
    message
}

pub fn request(pool: &DescriptorPool, name: &str) -> DynamicMessage {
    message(pool, "greeter.HelloRequest", "name", name)
}

pub fn reply(pool: &DescriptorPool, text: &str) -> DynamicMessage {
    message(pool, "greeter.HelloReply", "message", text)
}

pub fn greeter_signature(
    pool: &DescriptorPool,
    method: &str,
    call_type: CallType,
) -> MethodSignature {
    MethodSignature {
        service: "greeter.Greeter".to_string(),
        method: method.to_string(),
        call_type,
        request: pool.get_message_by_name("greeter.HelloRequest").expect("request"),
        response: pool.get_message_by_name("greeter.HelloReply").expect("reply"),
    }
}

/// What the scripted transport plays back for every call.
#[derive(Debug, Clone, Default)]
pub struct Script {
    replies: Vec<String>,
    failure: Option<Status>,
}

impl Script {
    pub fn replies(replies: &[&str]) -> Self {
        Self {
            replies: replies.iter().map(|r| r.to_string()).collect(),
            failure: None,
        }
    }

    pub fn failure(status: Status) -> Self {
        Self::default().failing(status)
    }

    /// Ends the call with `status` instead of completing it.
    pub fn failing(mut self, status: Status) -> Self {
        self.failure = Some(status);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    Unary,
    ServerStreaming,
    ClientStreaming,
    BidiStreaming,
}

pub struct ScriptedCall {
    response: MessageDescriptor,
}

/// In-memory transport replaying a [`Script`] from a spawned task and recording what it was
/// asked to do.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Script,
    new_calls: AtomicUsize,
    unary_requests: AtomicUsize,
    shutdowns: AtomicUsize,
    invocations: Mutex<Vec<Invocation>>,
    sent: std::sync::Arc<Mutex<Vec<DynamicMessage>>>,
}

impl ScriptedTransport {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            ..Default::default()
        }
    }

    pub fn new_calls(&self) -> usize {
        self.new_calls.load(Ordering::SeqCst)
    }

    pub fn unary_requests(&self) -> usize {
        self.unary_requests.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    /// Requests read from client streams. Only complete once the stream was half-closed.
    pub fn sent_requests(&self) -> Vec<DynamicMessage> {
        self.sent.lock().unwrap().clone()
    }

    fn record(&self, invocation: Invocation) {
        self.invocations.lock().unwrap().push(invocation);
    }

    fn play(&self, call: ScriptedCall, requests: Option<RequestStream>, mut observer: BoxObserver) {
        let script = self.script.clone();
        let sent = self.sent.clone();

        tokio::spawn(async move {
            if let Some(mut requests) = requests {
                // Reads until the half-close; a missing half-close hangs the call.
                while let Some(request) = requests.next().await {
                    sent.lock().unwrap().push(request);
                }
            }

            for text in &script.replies {
                let mut reply = DynamicMessage::new(call.response.clone());
                reply.set_field_by_name("message", Value::String(text.clone()));
                if let Err(status) = observer.on_next(reply) {
                    observer.on_error(status);
                    return;
                }
            }

            match script.failure {
                Some(status) => observer.on_error(status),
                None => observer.on_completed(),
            }
        });
    }
}

impl Transport for ScriptedTransport {
    type Call = ScriptedCall;

    fn new_call(&self, method: &MethodSignature, _options: &CallOptions) -> ScriptedCall {
        self.new_calls.fetch_add(1, Ordering::SeqCst);
        ScriptedCall {
            response: method.response.clone(),
        }
    }

    fn unary(&self, call: ScriptedCall, _request: DynamicMessage, observer: BoxObserver) {
        self.record(Invocation::Unary);
        self.unary_requests.fetch_add(1, Ordering::SeqCst);
        self.play(call, None, observer);
    }

    fn server_streaming(
        &self,
        call: ScriptedCall,
        _request: DynamicMessage,
        observer: BoxObserver,
    ) {
        self.record(Invocation::ServerStreaming);
        self.unary_requests.fetch_add(1, Ordering::SeqCst);
        self.play(call, None, observer);
    }

    fn client_streaming(&self, call: ScriptedCall, observer: BoxObserver) -> RequestSender {
        self.record(Invocation::ClientStreaming);
        let (sender, requests) = RequestSender::new();
        self.play(call, Some(requests), observer);
        sender
    }

    fn bidi_streaming(&self, call: ScriptedCall, observer: BoxObserver) -> RequestSender {
        self.record(Invocation::BidiStreaming);
        let (sender, requests) = RequestSender::new();
        self.play(call, Some(requests), observer);
        sender
    }

    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}
