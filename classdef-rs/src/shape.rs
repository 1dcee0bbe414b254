//! Array shapes.
//!
//! Every stored value carries a shape, even a scalar (`[1]`). Shapes follow
//! MATLAB conventions: data is laid out in column-major order and trailing
//! singleton dimensions carry no meaning, so `[3]`, `[3, 1]` and `[3, 1, 1]`
//! all describe the same column vector and compare equal.

use std::fmt;
use std::str::FromStr;

/// The dimensions of an array.
#[derive(Debug, Clone, Eq)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Create a shape from its dimensions.
    ///
    /// An empty dimension list is read as a scalar.
    pub fn new(dims: impl Into<Vec<usize>>) -> Self {
        let mut dims = dims.into();
        if dims.is_empty() {
            dims.push(1);
        }
        Shape { dims }
    }

    /// The shape of a scalar: `[1]`.
    pub fn scalar() -> Self {
        Shape { dims: vec![1] }
    }

    /// A MATLAB row vector `[1, n]`.
    pub fn row(n: usize) -> Self {
        Shape { dims: vec![1, n] }
    }

    /// The dimensions as given.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements, saturating at `usize::MAX`.
    pub fn numel(&self) -> usize {
        self.checked_numel().unwrap_or(usize::MAX)
    }

    /// Total number of elements, or `None` if the product overflows.
    pub fn checked_numel(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |n, &d| n.checked_mul(d))
    }

    /// True when every dimension is 1.
    pub fn is_scalar(&self) -> bool {
        self.dims.iter().all(|&d| d == 1)
    }

    /// True when the shape holds no elements.
    pub fn is_empty(&self) -> bool {
        self.numel() == 0
    }

    /// Dimensions padded to at least two, as MAT files and the text format
    /// store them.
    pub fn matrix_dims(&self) -> Vec<usize> {
        let mut dims = self.dims.clone();
        while dims.len() < 2 {
            dims.push(1);
        }
        dims
    }

    /// Dimensions with trailing singletons removed (keeping at least one).
    fn significant(&self) -> &[usize] {
        let mut end = self.dims.len();
        while end > 1 && self.dims[end - 1] == 1 {
            end -= 1;
        }
        &self.dims[..end]
    }
}

impl PartialEq for Shape {
    fn eq(&self, other: &Self) -> bool {
        self.significant() == other.significant()
    }
}

impl Default for Shape {
    fn default() -> Self {
        Self::scalar()
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape::new(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::new(dims.to_vec())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.dims.iter().map(|d| d.to_string()).collect();
        f.write_str(&parts.join("x"))
    }
}

impl FromStr for Shape {
    type Err = std::num::ParseIntError;

    /// Parse the `2x3x4` form produced by `Display`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let dims = s
            .split('x')
            .map(|part| part.trim().parse::<usize>())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Shape::new(dims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_singletons_ignored() {
        assert_eq!(Shape::new(vec![3]), Shape::new(vec![3, 1]));
        assert_eq!(Shape::scalar(), Shape::new(vec![1, 1, 1]));
        assert_ne!(Shape::new(vec![1, 3]), Shape::new(vec![3]));
    }

    #[test]
    fn test_numel_and_scalar() {
        assert_eq!(Shape::new(vec![2, 3, 4]).numel(), 24);
        assert!(Shape::new(vec![1, 1]).is_scalar());
        assert!(Shape::new(vec![0, 0]).is_empty());
        assert!(!Shape::new(vec![0, 0]).is_scalar());
        assert_eq!(Shape::new(Vec::new()), Shape::scalar());
    }

    #[test]
    fn test_numel_overflow() {
        let huge = Shape::new(vec![1 << 32, 1 << 32, 1 << 32]);
        assert_eq!(huge.checked_numel(), None);
        assert_eq!(huge.numel(), usize::MAX);
        assert_eq!(Shape::new(vec![0, usize::MAX]).checked_numel(), Some(0));
    }

    #[test]
    fn test_matrix_dims() {
        assert_eq!(Shape::scalar().matrix_dims(), vec![1, 1]);
        assert_eq!(Shape::new(vec![4]).matrix_dims(), vec![4, 1]);
        assert_eq!(Shape::new(vec![2, 3, 4]).matrix_dims(), vec![2, 3, 4]);
    }

    #[test]
    fn test_display_parse() {
        let shape: Shape = "2x3x4".parse().unwrap();
        assert_eq!(shape.dims(), &[2, 3, 4]);
        assert_eq!(shape.to_string(), "2x3x4");
        assert!("2xq".parse::<Shape>().is_err());
    }
}
