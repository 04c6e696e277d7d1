//! Face descriptors and nearest-label matching.
//!
//! Descriptors are produced by an external face-recognition model; this
//! module only validates them and compares them. Matching follows the
//! usual descriptor-distance rule: the best label is the one with the
//! smallest mean Euclidean distance, and it only counts as a match when
//! that distance is strictly below the threshold.

use serde::{Deserialize, Serialize};

/// Number of components in a face descriptor.
pub const DESCRIPTOR_LEN: usize = 128;

/// Default maximum distance for two descriptors to be the same face.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.5;

/// Errors that can occur when constructing a [`FaceDescriptor`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    /// The vector has the wrong number of components.
    #[error("descriptor must have {DESCRIPTOR_LEN} components (got {0})")]
    WrongLength(usize),
    /// The vector contains NaN or infinity.
    #[error("descriptor components must be finite")]
    NonFinite,
}

/// A validated face descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct FaceDescriptor(Vec<f32>);

impl FaceDescriptor {
    /// Validate a raw descriptor vector.
    ///
    /// # Errors
    ///
    /// Returns an error if the length is not [`DESCRIPTOR_LEN`] or any
    /// component is not finite.
    pub fn new(values: Vec<f32>) -> Result<Self, DescriptorError> {
        if values.len() != DESCRIPTOR_LEN {
            return Err(DescriptorError::WrongLength(values.len()));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(DescriptorError::NonFinite);
        }
        Ok(Self(values))
    }

    /// Descriptor components.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Euclidean distance to another descriptor.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f32 {
        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
    }
}

impl TryFrom<Vec<f32>> for FaceDescriptor {
    type Error = DescriptorError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl From<FaceDescriptor> for Vec<f32> {
    fn from(descriptor: FaceDescriptor) -> Self {
        descriptor.0
    }
}

/// One identity and its reference descriptors.
#[derive(Debug, Clone)]
pub struct LabeledDescriptors<L> {
    /// Identity the descriptors belong to.
    pub label: L,
    /// Reference descriptors (at least one).
    pub descriptors: Vec<FaceDescriptor>,
}

impl<L> LabeledDescriptors<L> {
    /// Label with a single reference descriptor.
    pub fn single(label: L, descriptor: FaceDescriptor) -> Self {
        Self {
            label,
            descriptors: vec![descriptor],
        }
    }

    fn mean_distance(&self, probe: &FaceDescriptor) -> Option<f32> {
        if self.descriptors.is_empty() {
            return None;
        }
        let total: f32 = self.descriptors.iter().map(|d| d.distance(probe)).sum();
        #[allow(clippy::cast_precision_loss)] // at most a handful of descriptors per label
        let count = self.descriptors.len() as f32;
        Some(total / count)
    }
}

/// Result of matching a probe descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum FaceMatch<L> {
    /// The closest label is within the threshold.
    Known {
        /// Matched identity.
        label: L,
        /// Mean distance to that identity's descriptors.
        distance: f32,
    },
    /// No label is close enough. `distance` is the best distance seen, if any.
    Unknown {
        /// Best mean distance found.
        distance: Option<f32>,
    },
}

impl<L> FaceMatch<L> {
    /// The matched label, if any.
    pub const fn label(&self) -> Option<&L> {
        match self {
            Self::Known { label, .. } => Some(label),
            Self::Unknown { .. } => None,
        }
    }
}

/// Matches probe descriptors against a fixed labelled set.
#[derive(Debug, Clone)]
pub struct FaceMatcher<L> {
    labeled: Vec<LabeledDescriptors<L>>,
    threshold: f32,
}

impl<L: Clone> FaceMatcher<L> {
    /// Build a matcher with the given distance threshold.
    #[must_use]
    pub const fn new(labeled: Vec<LabeledDescriptors<L>>, threshold: f32) -> Self {
        Self { labeled, threshold }
    }

    /// Whether there is anything to match against.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labeled.is_empty()
    }

    /// Distance threshold in use.
    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Find the closest label for a probe descriptor.
    #[must_use]
    pub fn best_match(&self, probe: &FaceDescriptor) -> FaceMatch<L> {
        let best = self
            .labeled
            .iter()
            .filter_map(|l| l.mean_distance(probe).map(|d| (l, d)))
            .min_by(|(_, a), (_, b)| a.total_cmp(b));

        match best {
            Some((labeled, distance)) if distance < self.threshold => FaceMatch::Known {
                label: labeled.label.clone(),
                distance,
            },
            Some((_, distance)) => FaceMatch::Unknown {
                distance: Some(distance),
            },
            None => FaceMatch::Unknown { distance: None },
        }
    }
}
