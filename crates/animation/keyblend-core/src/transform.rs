//! Rigid transform (position + orientation basis) used for every pose.
//!
//! The orientation is stored as a 3x3 basis so that the twelve components written
//! by the codec round-trip bit for bit. Interpolation goes through quaternions:
//! - position: component-wise lerp
//! - rotation: shortest-arc slerp
//! - ratio 0 and 1 return the operands exactly

use core::ops::Mul;

use glam::{DMat3, DQuat, DVec3};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 12]", into = "[f64; 12]")]
pub struct Transform {
    pub position: DVec3,
    pub basis: DMat3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: DVec3::ZERO,
        basis: DMat3::IDENTITY,
    };

    #[inline]
    pub fn from_translation(position: DVec3) -> Self {
        Self {
            position,
            basis: DMat3::IDENTITY,
        }
    }

    #[inline]
    pub fn from_rotation(rotation: DQuat) -> Self {
        Self {
            position: DVec3::ZERO,
            basis: DMat3::from_quat(rotation),
        }
    }

    #[inline]
    pub fn from_translation_rotation(position: DVec3, rotation: DQuat) -> Self {
        Self {
            position,
            basis: DMat3::from_quat(rotation),
        }
    }

    /// Build from `[x, y, z, r00, r01, r02, r10, r11, r12, r20, r21, r22]`
    /// (basis rows).
    pub fn from_components(c: [f64; 12]) -> Self {
        let rows = [c[3], c[4], c[5], c[6], c[7], c[8], c[9], c[10], c[11]];
        Self {
            position: DVec3::new(c[0], c[1], c[2]),
            // from_cols_array on row-major data yields the transpose.
            basis: DMat3::from_cols_array(&rows).transpose(),
        }
    }

    /// Inverse of [`Transform::from_components`].
    pub fn components(&self) -> [f64; 12] {
        let r = self.basis.transpose().to_cols_array();
        [
            self.position.x,
            self.position.y,
            self.position.z,
            r[0],
            r[1],
            r[2],
            r[3],
            r[4],
            r[5],
            r[6],
            r[7],
            r[8],
        ]
    }

    #[inline]
    pub fn rotation(&self) -> DQuat {
        DQuat::from_mat3(&self.basis).normalize()
    }

    #[inline]
    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.position + self.basis * point
    }

    pub fn inverse(&self) -> Self {
        let basis = self.basis.inverse();
        Self {
            position: -(basis * self.position),
            basis,
        }
    }

    /// Interpolate toward `other` by `alpha`.
    pub fn lerp(&self, other: &Transform, alpha: f64) -> Transform {
        if alpha == 0.0 {
            return *self;
        }
        if alpha == 1.0 {
            return *other;
        }
        let position = self.position.lerp(other.position, alpha);
        let rotation = self.rotation().slerp(other.rotation(), alpha);
        Transform {
            position,
            basis: DMat3::from_quat(rotation),
        }
    }
}

impl Mul for Transform {
    type Output = Transform;

    /// `self * rhs` applies `rhs` in the space of `self`.
    fn mul(self, rhs: Transform) -> Transform {
        Transform {
            position: self.transform_point(rhs.position),
            basis: self.basis * rhs.basis,
        }
    }
}

impl From<[f64; 12]> for Transform {
    fn from(c: [f64; 12]) -> Self {
        Self::from_components(c)
    }
}

impl From<Transform> for [f64; 12] {
    fn from(t: Transform) -> Self {
        t.components()
    }
}
