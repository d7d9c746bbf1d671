/// A resolved geographic position in WGS84 decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Parse one coordinate cell from a tabular source.
///
/// Surrounding whitespace is ignored; empty cells and values that do
/// not parse as finite numbers count as missing.
pub fn parse_coordinate(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}
