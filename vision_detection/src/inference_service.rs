use crate::detection::DetectionHandler;
use std::sync::Arc;
use tonic::{async_trait, Request, Response, Status};
use vision_proto::{
    object_detection_server::ObjectDetection, DetectObjectsRequest, DetectObjectsResponse,
};

#[derive(Debug)]
pub struct InferenceService<H: DetectionHandler> {
    handler: Arc<H>,
}

impl<H: DetectionHandler> InferenceService<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }
}

impl<H: DetectionHandler> Clone for InferenceService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
        }
    }
}

#[async_trait]
impl<H: DetectionHandler> ObjectDetection for InferenceService<H> {
    async fn detect_objects(
        &self,
        request: Request<DetectObjectsRequest>,
    ) -> Result<Response<DetectObjectsResponse>, Status> {
        let DetectObjectsRequest { image_b64 } = request.into_inner();

        let objects = match self.handler.detect_objects(&image_b64).await {
            Ok(objects) => objects,
            Err(err) => {
                tracing::warn!("Detection failed: {}", err);
                return Err(err.into());
            }
        };

        tracing::debug!("Returning {} detections", objects.len());
        for (i, detection) in objects.iter().enumerate() {
            tracing::debug!(
                "Detection {}: object={}, confidence={:.3}, rect=({}, {}, {}, {})",
                i,
                detection.object,
                detection.confidence,
                detection.rectangle.x,
                detection.rectangle.y,
                detection.rectangle.w,
                detection.rectangle.h
            );
        }

        Ok(Response::new(DetectObjectsResponse {
            objects: objects.into_iter().map(Into::into).collect(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{
        tests::{decoder, object, StubBackend},
        CachedDetectionHandler, LiveDetectionHandler,
    };
    use tonic::Code;

    fn request(image_b64: &str) -> Request<DetectObjectsRequest> {
        Request::new(DetectObjectsRequest {
            image_b64: image_b64.to_string(),
        })
    }

    #[tokio::test]
    async fn test_detect_objects() -> Result<(), Box<dyn std::error::Error>> {
        let backend = StubBackend::returning(vec![object("person", 0.95), object("bicycle", 0.88)]);
        let inference_service =
            InferenceService::new(LiveDetectionHandler::new(backend, decoder()));

        let response = inference_service.detect_objects(request("////")).await?;

        let objects = response.into_inner().objects;
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].object, "person");
        assert_eq!(objects[1].object, "bicycle");
        assert_eq!(objects[1].rectangle.unwrap().h, 130);

        Ok(())
    }

    #[tokio::test]
    async fn test_empty_result_is_a_valid_response() -> Result<(), Box<dyn std::error::Error>> {
        let backend = StubBackend::returning(vec![]);
        let inference_service =
            InferenceService::new(LiveDetectionHandler::new(backend, decoder()));

        let response = inference_service.detect_objects(request("////")).await?;

        assert!(response.into_inner().objects.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_payload_is_invalid_argument() {
        let backend = StubBackend::default();
        let inference_service =
            InferenceService::new(LiveDetectionHandler::new(backend.clone(), decoder()));

        let status = inference_service
            .detect_objects(request("not-base64!"))
            .await
            .unwrap_err();

        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_cached_handler_behind_service() -> Result<(), Box<dyn std::error::Error>> {
        let backend = StubBackend::default();
        backend.push_ok(vec![object("first", 0.5)]);
        backend.push_ok(vec![object("second", 0.5)]);
        let inference_service = InferenceService::new(CachedDetectionHandler::new(
            LiveDetectionHandler::new(backend.clone(), decoder()),
        ));

        inference_service.detect_objects(request("////")).await?;
        let response = inference_service.detect_objects(request("aGVsbG8=")).await?;

        assert_eq!(response.into_inner().objects[0].object, "first");
        assert_eq!(backend.calls(), 1);
        Ok(())
    }
}
