use crate::{
    client::ComputerVisionClient,
    config::{Config, PayloadConfig},
    decoder::ImageDecoder,
    detection::{CachedDetectionHandler, DetectionHandler, LiveDetectionHandler},
    inference_service::InferenceService,
};
use std::future::Future;
use tokio::{net::TcpListener, signal};
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::server::Router;
use tonic::transport::Server;
use vision_proto::object_detection_server::ObjectDetectionServer;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Protobuf field tag and length prefix around the image string.
const REQUEST_FRAMING_BYTES: usize = 64;

/// Largest `DetectObjectsRequest` that can carry an image of `max_image_bytes`,
/// including base64 wrapped at 76 columns with CRLF line breaks. Anything
/// larger is refused by the transport, the rest is judged by the decoder.
fn max_request_bytes(max_image_bytes: usize) -> usize {
    let encoded = 4 * max_image_bytes.div_ceil(3);
    encoded + encoded / 38 + REQUEST_FRAMING_BYTES
}

pub struct GrpcServer {
    router: Router,
    addr: String,
}

impl GrpcServer {
    pub async fn new<H: DetectionHandler>(
        handler: H,
        payload_config: &PayloadConfig,
        addr: &str,
    ) -> Result<Self, BoxError> {
        let inference_service = ObjectDetectionServer::new(InferenceService::new(handler))
            .max_decoding_message_size(max_request_bytes(payload_config.max_image_bytes));
        let reflection_service = tonic_reflection::server::Builder::configure()
            .register_encoded_file_descriptor_set(vision_proto::FILE_DESCRIPTOR_SET)
            .build_v1alpha()?;

        let (health_reporter, health_service) = tonic_health::server::health_reporter();
        health_reporter
            .set_serving::<ObjectDetectionServer<InferenceService<H>>>()
            .await;

        let router = Server::builder()
            .add_service(inference_service)
            .add_service(reflection_service)
            .add_service(health_service);

        Ok(Self {
            router,
            addr: addr.to_string(),
        })
    }

    pub async fn run(self) -> Result<(), BoxError> {
        let listener = TcpListener::bind(&self.addr).await?;

        let shutdown = async {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, starting graceful shutdown")
        };

        self.serve(listener, shutdown).await
    }

    /// Serves on an already bound listener until `shutdown` resolves. The
    /// router, and with it the handler and its client, is dropped on return.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), BoxError>
    where
        F: Future<Output = ()>,
    {
        let local_addr = listener.local_addr()?;
        tracing::info!("Serving RPC for object detection on {}", local_addr);

        self.router
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
            .await?;

        tracing::info!("Server on {} stopped, detection client released", local_addr);
        Ok(())
    }
}

pub async fn start_server(config: Config) -> Result<(), BoxError> {
    let client = ComputerVisionClient::new(&config.credentials, &config.backend)?;
    let handler = LiveDetectionHandler::new(client, ImageDecoder::new(&config.payload));

    let addr = config.server.get_address();
    let grpc_server = if config.debug.cache_first_response {
        tracing::warn!(
            "Debug cache enabled: every call returns the first response, \
             results for any later image are wrong"
        );
        GrpcServer::new(CachedDetectionHandler::new(handler), &config.payload, &addr).await?
    } else {
        GrpcServer::new(handler, &config.payload, &addr).await?
    };

    grpc_server.run().await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
