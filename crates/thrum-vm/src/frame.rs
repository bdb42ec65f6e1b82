//! Boxed sample buffers for VM input and output.

use std::fmt;

/// A frame of 32-bit samples, the unit of VM I/O.
///
/// The sample count of the input frame determines how many vector-stack
/// slots each vector value occupies for the duration of a call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    samples: Vec<f32>,
}

impl Frame {
    pub fn from_samples(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    /// A frame of `len` copies of `value`.
    pub fn splat(value: f32, len: usize) -> Self {
        Self {
            samples: vec![value; len],
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for sample in &self.samples {
            write!(f, " {sample}")?;
        }
        write!(f, " }}")
    }
}
