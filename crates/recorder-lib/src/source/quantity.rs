//! Kubernetes resource quantity parsing
//!
//! Handles the serialized forms the metrics API emits: decimal SI
//! suffixes (`250m`, `2G`), binary suffixes (`512Mi`) and decimal
//! exponents (`1e3`).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("empty quantity")]
    Empty,
    #[error("invalid quantity number: {0}")]
    InvalidNumber(String),
    #[error("unknown quantity suffix: {0}")]
    UnknownSuffix(String),
}

/// Parse a quantity string into its numeric value
pub fn parse_quantity(input: &str) -> Result<f64, QuantityError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(QuantityError::Empty);
    }

    let split = input
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '+' || c == '-'))
        .unwrap_or(input.len());
    let (number, suffix) = input.split_at(split);

    let value: f64 = number
        .parse()
        .map_err(|_| QuantityError::InvalidNumber(input.to_string()))?;

    Ok(value * multiplier(suffix)?)
}

fn multiplier(suffix: &str) -> Result<f64, QuantityError> {
    let m = match suffix {
        "" => 1.0,
        "n" => 1e-9,
        "u" => 1e-6,
        "m" => 1e-3,
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        "Ki" => 1024.0,
        "Mi" => 1024f64.powi(2),
        "Gi" => 1024f64.powi(3),
        "Ti" => 1024f64.powi(4),
        "Pi" => 1024f64.powi(5),
        "Ei" => 1024f64.powi(6),
        s if s.starts_with(['e', 'E']) => {
            let exp: i32 = s[1..]
                .parse()
                .map_err(|_| QuantityError::UnknownSuffix(s.to_string()))?;
            10f64.powi(exp)
        }
        s => return Err(QuantityError::UnknownSuffix(s.to_string())),
    };
    Ok(m)
}
