use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A position on the canvas, in canvas pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Freehand tool a stroke was drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokeTool {
    Brush,
    Eraser,
}

/// Kind of a committed shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Rect,
    Circle,
}

/// A freehand stroke following a sequence of sampled points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeOperation {
    // The tool the stroke was drawn with.
    pub tool: StrokeTool,
    // CSS-style color of the stroke.
    pub color: String,
    // Line width in canvas pixels, must be positive.
    pub width_px: f64,
    // The sampled path in draw order, must not be empty.
    pub points: Vec<Point>,
    // Identity of the committing participant, stamped by the server.
    #[serde(default)]
    pub author_id: String,
}

/// A shape dragged between two opposite corners of its bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeOperation {
    // The kind of the shape.
    pub kind: ShapeKind,
    // CSS-style color of the outline.
    pub color: String,
    // Outline width in canvas pixels, must be positive.
    pub width_px: f64,
    // Corner where the drag started.
    pub start: Point,
    // Corner where the drag ended.
    pub end: Point,
    // Identity of the committing participant, stamped by the server.
    #[serde(default)]
    pub author_id: String,
}

/// A text label placed at a fixed position on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOperation {
    // The label content, must not be empty.
    pub text: String,
    pub x: f64,
    pub y: f64,
    // CSS-style color of the text.
    pub color: String,
    // Font size in canvas pixels, must be positive.
    pub size_px: f64,
    // Identity of the committing participant, stamped by the server.
    #[serde(default)]
    pub author_id: String,
}

/// One atomic drawing action in a room's history.
/// Operations are immutable once committed; clients reconstruct the canvas by
/// replaying the committed sequence in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum Operation {
    Stroke(StrokeOperation),
    Shape(ShapeOperation),
    Text(TextOperation),
}

/// Reasons an operation submitted by a client is rejected before it reaches
/// a room's history.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidOperation {
    #[error("stroke must contain at least one point")]
    EmptyStroke,
    #[error("width must be a positive number, got {0}")]
    InvalidWidth(f64),
    #[error("text must not be empty")]
    EmptyText,
    #[error("text size must be a positive number, got {0}")]
    InvalidTextSize(f64),
}

fn is_positive_finite(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

impl Operation {
    /// Checks the invariants a client-submitted operation must satisfy
    /// before it may enter a room's history.
    pub fn validate(&self) -> Result<(), InvalidOperation> {
        match self {
            Operation::Stroke(stroke) => {
                if stroke.points.is_empty() {
                    return Err(InvalidOperation::EmptyStroke);
                }
                if !is_positive_finite(stroke.width_px) {
                    return Err(InvalidOperation::InvalidWidth(stroke.width_px));
                }
            }
            Operation::Shape(shape) => {
                if !is_positive_finite(shape.width_px) {
                    return Err(InvalidOperation::InvalidWidth(shape.width_px));
                }
            }
            Operation::Text(text) => {
                if text.text.is_empty() {
                    return Err(InvalidOperation::EmptyText);
                }
                if !is_positive_finite(text.size_px) {
                    return Err(InvalidOperation::InvalidTextSize(text.size_px));
                }
            }
        }

        Ok(())
    }

    /// Returns the operation with its author replaced by the committing
    /// participant's identity. Whatever the client sent is discarded.
    #[must_use]
    pub fn stamped(mut self, author_id: &str) -> Operation {
        match &mut self {
            Operation::Stroke(stroke) => stroke.author_id = author_id.to_string(),
            Operation::Shape(shape) => shape.author_id = author_id.to_string(),
            Operation::Text(text) => text.author_id = author_id.to_string(),
        }

        self
    }

    /// The identity stamped into the operation at commit time; empty for an
    /// operation that has not been committed yet.
    pub fn author_id(&self) -> &str {
        match self {
            Operation::Stroke(stroke) => &stroke.author_id,
            Operation::Shape(shape) => &shape.author_id,
            Operation::Text(text) => &text.author_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brush_stroke(points: Vec<Point>) -> Operation {
        Operation::Stroke(StrokeOperation {
            tool: StrokeTool::Brush,
            color: "#ef4444".to_string(),
            width_px: 4.0,
            points,
            author_id: String::new(),
        })
    }

    // given an operation, and an expected string, asserts that the operation is serialized / deserialized appropiately
    fn assert_operation_serialization(operation: &Operation, expected: &str) {
        let serialized = serde_json::to_string(&operation).unwrap();
        assert_eq!(serialized, expected);
        let deserialized: Operation = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, *operation);
    }

    #[test]
    fn test_stroke_operation_serialization() {
        let operation = Operation::Stroke(StrokeOperation {
            tool: StrokeTool::Brush,
            color: "#ef4444".to_string(),
            width_px: 4.0,
            points: vec![Point { x: 0.0, y: 0.0 }, Point { x: 1.0, y: 1.0 }],
            author_id: "u1".to_string(),
        });

        assert_operation_serialization(
            &operation,
            r##"{"t":"stroke","tool":"brush","color":"#ef4444","width_px":4.0,"points":[{"x":0.0,"y":0.0},{"x":1.0,"y":1.0}],"author_id":"u1"}"##,
        );
    }

    #[test]
    fn test_eraser_stroke_operation_serialization() {
        let operation = Operation::Stroke(StrokeOperation {
            tool: StrokeTool::Eraser,
            color: "#000000".to_string(),
            width_px: 24.0,
            points: vec![Point { x: 5.0, y: 7.5 }],
            author_id: "u2".to_string(),
        });

        assert_operation_serialization(
            &operation,
            r##"{"t":"stroke","tool":"eraser","color":"#000000","width_px":24.0,"points":[{"x":5.0,"y":7.5}],"author_id":"u2"}"##,
        );
    }

    #[test]
    fn test_shape_operation_serialization() {
        let operation = Operation::Shape(ShapeOperation {
            kind: ShapeKind::Rect,
            color: "#3b82f6".to_string(),
            width_px: 2.0,
            start: Point { x: 10.0, y: 10.0 },
            end: Point { x: 40.0, y: 30.0 },
            author_id: "u1".to_string(),
        });

        assert_operation_serialization(
            &operation,
            r##"{"t":"shape","kind":"rect","color":"#3b82f6","width_px":2.0,"start":{"x":10.0,"y":10.0},"end":{"x":40.0,"y":30.0},"author_id":"u1"}"##,
        );
    }

    #[test]
    fn test_text_operation_serialization() {
        let operation = Operation::Text(TextOperation {
            text: "hello".to_string(),
            x: 100.0,
            y: 50.0,
            color: "#22c55e".to_string(),
            size_px: 16.0,
            author_id: "u3".to_string(),
        });

        assert_operation_serialization(
            &operation,
            r##"{"t":"text","text":"hello","x":100.0,"y":50.0,"color":"#22c55e","size_px":16.0,"author_id":"u3"}"##,
        );
    }

    #[test]
    fn test_operation_without_author_deserializes_with_empty_author() {
        let operation: Operation = serde_json::from_str(
            r##"{"t":"text","text":"hi","x":10.0,"y":20.0,"color":"#222222","size_px":16.0}"##,
        )
        .unwrap();

        assert_eq!(operation.author_id(), "");
    }

    #[test]
    fn test_stamping_overwrites_client_supplied_author() {
        let operation: Operation = serde_json::from_str(
            r##"{"t":"shape","kind":"circle","color":"#a855f7","width_px":3.0,"start":{"x":0.0,"y":0.0},"end":{"x":8.0,"y":8.0},"author_id":"spoofed"}"##,
        )
        .unwrap();

        let stamped = operation.stamped("srv-1");

        assert_eq!(stamped.author_id(), "srv-1");
    }

    #[test]
    fn test_valid_stroke_passes_validation() {
        let operation = brush_stroke(vec![Point { x: 0.0, y: 0.0 }, Point { x: 1.0, y: 1.0 }]);

        assert_eq!(operation.validate(), Ok(()));
    }

    #[test]
    fn test_stroke_without_points_is_rejected() {
        let operation = brush_stroke(Vec::new());

        assert_eq!(operation.validate(), Err(InvalidOperation::EmptyStroke));
    }

    #[test]
    fn test_stroke_with_non_positive_width_is_rejected() {
        let operation = Operation::Stroke(StrokeOperation {
            tool: StrokeTool::Brush,
            color: "#ef4444".to_string(),
            width_px: 0.0,
            points: vec![Point { x: 0.0, y: 0.0 }],
            author_id: String::new(),
        });

        assert_eq!(
            operation.validate(),
            Err(InvalidOperation::InvalidWidth(0.0))
        );
    }

    #[test]
    fn test_stroke_with_non_finite_width_is_rejected() {
        let operation = Operation::Stroke(StrokeOperation {
            tool: StrokeTool::Brush,
            color: "#ef4444".to_string(),
            width_px: f64::NAN,
            points: vec![Point { x: 0.0, y: 0.0 }],
            author_id: String::new(),
        });

        assert!(matches!(
            operation.validate(),
            Err(InvalidOperation::InvalidWidth(_))
        ));
    }

    #[test]
    fn test_shape_with_negative_width_is_rejected() {
        let operation = Operation::Shape(ShapeOperation {
            kind: ShapeKind::Circle,
            color: "#eab308".to_string(),
            width_px: -1.0,
            start: Point { x: 0.0, y: 0.0 },
            end: Point { x: 4.0, y: 4.0 },
            author_id: String::new(),
        });

        assert_eq!(
            operation.validate(),
            Err(InvalidOperation::InvalidWidth(-1.0))
        );
    }

    #[test]
    fn test_text_without_content_is_rejected() {
        let operation = Operation::Text(TextOperation {
            text: String::new(),
            x: 0.0,
            y: 0.0,
            color: "#222222".to_string(),
            size_px: 16.0,
            author_id: String::new(),
        });

        assert_eq!(operation.validate(), Err(InvalidOperation::EmptyText));
    }

    #[test]
    fn test_text_with_non_positive_size_is_rejected() {
        let operation = Operation::Text(TextOperation {
            text: "hi".to_string(),
            x: 0.0,
            y: 0.0,
            color: "#222222".to_string(),
            size_px: 0.0,
            author_id: String::new(),
        });

        assert_eq!(
            operation.validate(),
            Err(InvalidOperation::InvalidTextSize(0.0))
        );
    }
}
