//! Protobuf types for the recorder control API
//!
//! With the `proto-gen` feature the code is generated at build time by
//! tonic-build from `proto/recorder/v1/recorder.proto`. Without it the
//! checked-in definitions below are compiled; keep them in sync with the
//! proto file.

#[cfg(feature = "proto-gen")]
pub mod recorder {
    pub mod v1 {
        tonic::include_proto!("recorder.v1");
    }
}

#[cfg(not(feature = "proto-gen"))]
pub mod recorder {
    pub mod v1 {
        use prost::Message;

        #[derive(Clone, PartialEq, Message)]
        pub struct StartRecordingRequest {
            #[prost(string, tag = "1")]
            pub run_id: String,
            #[prost(int64, tag = "2")]
            pub interval_ms: i64,
            #[prost(string, repeated, tag = "3")]
            pub workload_ids: Vec<String>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct StopRecordingRequest {
            #[prost(string, tag = "1")]
            pub run_id: String,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct Ack {
            #[prost(bool, tag = "1")]
            pub status: bool,
            #[prost(string, tag = "2")]
            pub message: String,
        }

        pub mod metrics_recorder_server {
            #![allow(unused_variables, dead_code, missing_docs, clippy::let_unit_value)]
            use tonic::codegen::*;

            /// Server-side handler for the `recorder.v1.MetricsRecorder` service
            #[async_trait]
            pub trait MetricsRecorder: Send + Sync + 'static {
                async fn start_recording(
                    &self,
                    request: tonic::Request<super::StartRecordingRequest>,
                ) -> std::result::Result<tonic::Response<super::Ack>, tonic::Status>;

                async fn stop_recording(
                    &self,
                    request: tonic::Request<super::StopRecordingRequest>,
                ) -> std::result::Result<tonic::Response<super::Ack>, tonic::Status>;
            }

            #[derive(Debug)]
            pub struct MetricsRecorderServer<T: MetricsRecorder> {
                inner: _Inner<T>,
                accept_compression_encodings: EnabledCompressionEncodings,
                send_compression_encodings: EnabledCompressionEncodings,
                max_decoding_message_size: Option<usize>,
                max_encoding_message_size: Option<usize>,
            }

            struct _Inner<T>(Arc<T>);

            impl<T: MetricsRecorder> MetricsRecorderServer<T> {
                pub fn new(inner: T) -> Self {
                    Self::from_arc(Arc::new(inner))
                }

                pub fn from_arc(inner: Arc<T>) -> Self {
                    let inner = _Inner(inner);
                    Self {
                        inner,
                        accept_compression_encodings: Default::default(),
                        send_compression_encodings: Default::default(),
                        max_decoding_message_size: None,
                        max_encoding_message_size: None,
                    }
                }

                /// Limits the maximum size of a decoded message.
                pub fn max_decoding_message_size(mut self, limit: usize) -> Self {
                    self.max_decoding_message_size = Some(limit);
                    self
                }

                /// Limits the maximum size of an encoded message.
                pub fn max_encoding_message_size(mut self, limit: usize) -> Self {
                    self.max_encoding_message_size = Some(limit);
                    self
                }
            }

            impl<T, B> tonic::codegen::Service<http::Request<B>> for MetricsRecorderServer<T>
            where
                T: MetricsRecorder,
                B: Body + Send + 'static,
                B::Error: Into<StdError> + Send + 'static,
            {
                type Response = http::Response<tonic::body::BoxBody>;
                type Error = std::convert::Infallible;
                type Future = BoxFuture<Self::Response, Self::Error>;

                fn poll_ready(
                    &mut self,
                    _cx: &mut Context<'_>,
                ) -> Poll<std::result::Result<(), Self::Error>> {
                    Poll::Ready(Ok(()))
                }

                fn call(&mut self, req: http::Request<B>) -> Self::Future {
                    let inner = self.inner.clone();
                    match req.uri().path() {
                        "/recorder.v1.MetricsRecorder/StartRecording" => {
                            #[allow(non_camel_case_types)]
                            struct StartRecordingSvc<T: MetricsRecorder>(pub Arc<T>);
                            impl<T: MetricsRecorder>
                                tonic::server::UnaryService<super::StartRecordingRequest>
                                for StartRecordingSvc<T>
                            {
                                type Response = super::Ack;
                                type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;

                                fn call(
                                    &mut self,
                                    request: tonic::Request<super::StartRecordingRequest>,
                                ) -> Self::Future {
                                    let inner = Arc::clone(&self.0);
                                    let fut = async move { (*inner).start_recording(request).await };
                                    Box::pin(fut)
                                }
                            }
                            let accept_compression_encodings = self.accept_compression_encodings;
                            let send_compression_encodings = self.send_compression_encodings;
                            let max_decoding_message_size = self.max_decoding_message_size;
                            let max_encoding_message_size = self.max_encoding_message_size;
                            let fut = async move {
                                let inner = inner.0;
                                let method = StartRecordingSvc(inner);
                                let codec = tonic::codec::ProstCodec::default();
                                let mut grpc = tonic::server::Grpc::new(codec)
                                    .apply_compression_config(
                                        accept_compression_encodings,
                                        send_compression_encodings,
                                    )
                                    .apply_max_message_size_config(
                                        max_decoding_message_size,
                                        max_encoding_message_size,
                                    );
                                let res = grpc.unary(method, req).await;
                                Ok(res)
                            };
                            Box::pin(fut)
                        }
                        "/recorder.v1.MetricsRecorder/StopRecording" => {
                            #[allow(non_camel_case_types)]
                            struct StopRecordingSvc<T: MetricsRecorder>(pub Arc<T>);
                            impl<T: MetricsRecorder>
                                tonic::server::UnaryService<super::StopRecordingRequest>
                                for StopRecordingSvc<T>
                            {
                                type Response = super::Ack;
                                type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;

                                fn call(
                                    &mut self,
                                    request: tonic::Request<super::StopRecordingRequest>,
                                ) -> Self::Future {
                                    let inner = Arc::clone(&self.0);
                                    let fut = async move { (*inner).stop_recording(request).await };
                                    Box::pin(fut)
                                }
                            }
                            let accept_compression_encodings = self.accept_compression_encodings;
                            let send_compression_encodings = self.send_compression_encodings;
                            let max_decoding_message_size = self.max_decoding_message_size;
                            let max_encoding_message_size = self.max_encoding_message_size;
                            let fut = async move {
                                let inner = inner.0;
                                let method = StopRecordingSvc(inner);
                                let codec = tonic::codec::ProstCodec::default();
                                let mut grpc = tonic::server::Grpc::new(codec)
                                    .apply_compression_config(
                                        accept_compression_encodings,
                                        send_compression_encodings,
                                    )
                                    .apply_max_message_size_config(
                                        max_decoding_message_size,
                                        max_encoding_message_size,
                                    );
                                let res = grpc.unary(method, req).await;
                                Ok(res)
                            };
                            Box::pin(fut)
                        }
                        _ => Box::pin(async move {
                            Ok(http::Response::builder()
                                .status(200)
                                .header("grpc-status", "12")
                                .header("content-type", "application/grpc")
                                .body(empty_body())
                                .unwrap())
                        }),
                    }
                }
            }

            impl<T: MetricsRecorder> Clone for MetricsRecorderServer<T> {
                fn clone(&self) -> Self {
                    let inner = self.inner.clone();
                    Self {
                        inner,
                        accept_compression_encodings: self.accept_compression_encodings,
                        send_compression_encodings: self.send_compression_encodings,
                        max_decoding_message_size: self.max_decoding_message_size,
                        max_encoding_message_size: self.max_encoding_message_size,
                    }
                }
            }

            impl<T: MetricsRecorder> Clone for _Inner<T> {
                fn clone(&self) -> Self {
                    Self(Arc::clone(&self.0))
                }
            }

            impl<T: std::fmt::Debug> std::fmt::Debug for _Inner<T> {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{:?}", self.0)
                }
            }

            impl<T: MetricsRecorder> tonic::server::NamedService for MetricsRecorderServer<T> {
                const NAME: &'static str = "recorder.v1.MetricsRecorder";
            }
        }

        pub mod metrics_recorder_client {
            use super::*;
            use tonic::codegen::*;
            use tonic::transport::Uri;

            #[derive(Debug, Clone)]
            pub struct MetricsRecorderClient<T> {
                inner: tonic::client::Grpc<T>,
            }

            impl MetricsRecorderClient<tonic::transport::Channel> {
                /// Attempt to create a new client by connecting to a given endpoint.
                pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
                where
                    D: TryInto<tonic::transport::Endpoint>,
                    D::Error: Into<StdError>,
                {
                    let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
                    Ok(Self::new(conn))
                }

                pub fn new(channel: tonic::transport::Channel) -> Self {
                    let inner = tonic::client::Grpc::new(channel);
                    Self { inner }
                }
            }

            impl<T> MetricsRecorderClient<T>
            where
                T: tonic::client::GrpcService<tonic::body::BoxBody>,
                T::Error: Into<StdError>,
                T::ResponseBody: Body<Data = Bytes> + Send + 'static,
                <T::ResponseBody as Body>::Error: Into<StdError> + Send,
            {
                pub fn with_origin(inner: T, origin: Uri) -> Self {
                    let inner = tonic::client::Grpc::with_origin(inner, origin);
                    Self { inner }
                }

                pub async fn start_recording(
                    &mut self,
                    request: impl tonic::IntoRequest<StartRecordingRequest>,
                ) -> Result<tonic::Response<Ack>, tonic::Status> {
                    self.inner.ready().await.map_err(|e| {
                        tonic::Status::new(
                            tonic::Code::Unknown,
                            format!("Service was not ready: {}", e.into()),
                        )
                    })?;
                    let codec = tonic::codec::ProstCodec::default();
                    let path = http::uri::PathAndQuery::from_static(
                        "/recorder.v1.MetricsRecorder/StartRecording",
                    );
                    self.inner.unary(request.into_request(), path, codec).await
                }

                pub async fn stop_recording(
                    &mut self,
                    request: impl tonic::IntoRequest<StopRecordingRequest>,
                ) -> Result<tonic::Response<Ack>, tonic::Status> {
                    self.inner.ready().await.map_err(|e| {
                        tonic::Status::new(
                            tonic::Code::Unknown,
                            format!("Service was not ready: {}", e.into()),
                        )
                    })?;
                    let codec = tonic::codec::ProstCodec::default();
                    let path = http::uri::PathAndQuery::from_static(
                        "/recorder.v1.MetricsRecorder/StopRecording",
                    );
                    self.inner.unary(request.into_request(), path, codec).await
                }
            }
        }
    }
}

pub use recorder::v1::metrics_recorder_client::MetricsRecorderClient;
pub use recorder::v1::metrics_recorder_server::{MetricsRecorder, MetricsRecorderServer};
pub use recorder::v1::*;

impl Ack {
    /// Successful acknowledgement
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: true,
            message: message.into(),
        }
    }

    /// Failed acknowledgement
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: false,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_start_request_wire_format() {
        let req = StartRecordingRequest {
            run_id: "r1".to_string(),
            interval_ms: 1000,
            workload_ids: vec!["pod-a".to_string(), "pod-b".to_string()],
        };

        let bytes = req.encode_to_vec();
        // field 1, length-delimited
        assert_eq!(bytes[0], 0x0a);

        let decoded = StartRecordingRequest::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn test_ack_constructors() {
        let ok = Ack::success("started");
        assert!(ok.status);
        assert_eq!(ok.message, "started");

        let failed = Ack::failure("interval_ms must be positive");
        assert!(!failed.status);
    }
}
