use serde::{Deserialize, Serialize};

/// Aspect of the generated image. Drives the canvas display class and is
/// sent to the backend by its lowercase name.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Shape {
    #[default]
    Square,
    Portrait,
    Landscape,
}

impl Shape {
    /// CSS class list of the canvas that displays an image of this shape
    pub fn canvas_class(self) -> String {
        format!("canvas canvas--{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_shape_names_match_wire_and_display() {
        for shape in Shape::iter() {
            let wire = serde_json::to_value(shape).unwrap();
            assert_eq!(wire, serde_json::Value::String(shape.to_string()));
            assert_eq!(Shape::from_str(&shape.to_string()).unwrap(), shape);
        }
    }

    #[test]
    fn test_canvas_class() {
        assert_eq!(Shape::Portrait.canvas_class(), "canvas canvas--portrait");
        assert_eq!(Shape::from_str("LANDSCAPE").unwrap(), Shape::Landscape);
        assert!(Shape::from_str("hexagon").is_err());
    }
}
