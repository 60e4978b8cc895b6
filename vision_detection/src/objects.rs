//! Records returned by the vision backend's detect operation.
//!
//! The schema belongs to the backend. Unknown fields are ignored and missing
//! ones take their defaults, so whatever the backend sends is passed through.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DetectionResult {
    pub objects: Vec<DetectedObject>,
    pub request_id: Option<String>,
    pub metadata: Option<ImageMetadata>,
    pub model_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectedObject {
    pub rectangle: BoundingRect,
    pub object: String,
    pub confidence: f64,
    pub parent: Option<Box<ObjectHierarchy>>,
}

/// Pixel rectangle, origin at the top left corner of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BoundingRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// Broader category of a detected object, e.g. "Labrador" -> "dog" -> "mammal".
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ObjectHierarchy {
    pub object: String,
    pub confidence: f64,
    pub parent: Option<Box<ObjectHierarchy>>,
}

/// Error body of a failed backend call.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ErrorEnvelope {
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl From<BoundingRect> for vision_proto::BoundingRect {
    fn from(rect: BoundingRect) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            w: rect.w,
            h: rect.h,
        }
    }
}

impl From<ObjectHierarchy> for vision_proto::ObjectHierarchy {
    fn from(hierarchy: ObjectHierarchy) -> Self {
        Self {
            object: hierarchy.object,
            confidence: hierarchy.confidence,
            parent: hierarchy.parent.map(|parent| Box::new((*parent).into())),
        }
    }
}

impl From<DetectedObject> for vision_proto::DetectedObject {
    fn from(object: DetectedObject) -> Self {
        Self {
            rectangle: Some(object.rectangle.into()),
            object: object.object,
            confidence: object.confidence,
            parent: object.parent.map(|parent| (*parent).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETECT_RESPONSE: &str = r#"{
        "objects": [
            {
                "rectangle": {"x": 730, "y": 66, "w": 135, "h": 85},
                "object": "kitchen appliance",
                "confidence": 0.501
            },
            {
                "rectangle": {"x": 523, "y": 377, "w": 185, "h": 46},
                "object": "computer keyboard",
                "confidence": 0.51
            },
            {
                "rectangle": {"x": 471, "y": 218, "w": 289, "h": 226},
                "object": "Laptop",
                "confidence": 0.85,
                "parent": {
                    "object": "computer",
                    "confidence": 0.851,
                    "parent": {"object": "electronics", "confidence": 0.9}
                }
            }
        ],
        "requestId": "25018882-a494-4e64-8196-f627a35c1135",
        "metadata": {"height": 692, "width": 1038, "format": "Jpeg"},
        "modelVersion": "2021-04-01"
    }"#;

    #[test]
    fn test_parse_detect_response_keeps_order() {
        let result: DetectionResult = serde_json::from_str(DETECT_RESPONSE).unwrap();

        let labels: Vec<&str> = result.objects.iter().map(|o| o.object.as_str()).collect();
        assert_eq!(labels, ["kitchen appliance", "computer keyboard", "Laptop"]);
        assert_eq!(
            result.objects[2].rectangle,
            BoundingRect {
                x: 471,
                y: 218,
                w: 289,
                h: 226
            }
        );
        assert_eq!(result.metadata.unwrap().width, 1038);
        assert_eq!(result.model_version.as_deref(), Some("2021-04-01"));

        let parent = result.objects[2].parent.as_ref().unwrap();
        assert_eq!(parent.object, "computer");
        assert_eq!(parent.parent.as_ref().unwrap().object, "electronics");
    }

    #[test]
    fn test_missing_objects_field_is_empty() {
        let result: DetectionResult = serde_json::from_str(r#"{"requestId": "abc"}"#).unwrap();

        assert!(result.objects.is_empty());
    }

    #[test]
    fn test_into_proto_keeps_hierarchy() {
        let result: DetectionResult = serde_json::from_str(DETECT_RESPONSE).unwrap();
        let laptop: vision_proto::DetectedObject = result.objects[2].clone().into();

        assert_eq!(laptop.object, "Laptop");
        assert_eq!(laptop.rectangle.unwrap().w, 289);
        let parent = laptop.parent.unwrap();
        assert_eq!(parent.object, "computer");
        assert_eq!(parent.parent.unwrap().object, "electronics");
    }
}
