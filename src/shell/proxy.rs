//! Implicit surface built from per-polygon bounding spheres.

use bevy::prelude::*;

use crate::math::BoundingSphere;

/// Default tessellation cell size, in host units.
pub const DEFAULT_RESOLUTION: f32 = 0.2;

/// Field value at which the surface is extracted.
pub const DEFAULT_THRESHOLD: f32 = 0.6;

/// Peak contribution of one sphere at its center.
pub const DEFAULT_STIFFNESS: f32 = 2.0;

/// An unordered set of spheres whose summed falloff fields define a smooth,
/// blobby surface around the source geometry.
///
/// Each sphere contributes `stiffness * (1 - d²/r²)³` inside its radius and
/// nothing outside. Sphere centers are in the proxy entity's local space.
#[derive(Component, Clone, Debug, PartialEq)]
pub struct ImplicitSurfaceProxy {
    pub spheres: Vec<BoundingSphere>,
    pub resolution: f32,
    pub threshold: f32,
    pub stiffness: f32,
}

impl Default for ImplicitSurfaceProxy {
    fn default() -> Self {
        Self::new(DEFAULT_RESOLUTION)
    }
}

impl ImplicitSurfaceProxy {
    pub fn new(resolution: f32) -> Self {
        Self {
            spheres: Vec::new(),
            resolution,
            threshold: DEFAULT_THRESHOLD,
            stiffness: DEFAULT_STIFFNESS,
        }
    }

    pub fn add_sphere(&mut self, sphere: BoundingSphere) {
        self.spheres.push(sphere);
    }

    pub fn sphere_count(&self) -> usize {
        self.spheres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
    }

    /// Axis-aligned bounds of every sphere, or `None` when empty.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = self.spheres.first()?;
        Some(self.spheres.iter().fold((first.min(), first.max()), |(lo, hi), s| {
            (lo.min(s.min()), hi.max(s.max()))
        }))
    }

    /// Radius of the region where `sphere` alone reaches the threshold.
    ///
    /// `None` when a lone sphere can never reach it. Overlapping spheres only
    /// raise the field, so this region is always inside the surface.
    pub fn iso_radius(&self, sphere: &BoundingSphere) -> Option<f32> {
        let t = self.threshold / self.stiffness;
        if !(t > 0.0 && t < 1.0) || sphere.radius <= 0.0 {
            return None;
        }
        Some(sphere.radius * (1.0 - t.cbrt()).sqrt())
    }

    /// Smallest [`iso_radius`](Self::iso_radius) over all spheres.
    pub fn min_iso_radius(&self) -> Option<f32> {
        self.spheres
            .iter()
            .filter_map(|s| self.iso_radius(s))
            .reduce(f32::min)
    }

    /// Value and gradient of one sphere's contribution at `p`.
    #[inline]
    pub fn sphere_contribution(&self, sphere: &BoundingSphere, p: Vec3) -> Option<(f32, Vec3)> {
        let r2 = sphere.radius * sphere.radius;
        if r2 <= 0.0 {
            return None;
        }
        let offset = p - sphere.center;
        let d2 = offset.length_squared();
        if d2 >= r2 {
            return None;
        }

        let t = 1.0 - d2 / r2;
        let value = self.stiffness * t * t * t;
        let gradient = offset * (-6.0 * self.stiffness * t * t / r2);
        Some((value, gradient))
    }

    /// Summed field value at `p`.
    pub fn field(&self, p: Vec3) -> f32 {
        self.spheres
            .iter()
            .filter_map(|s| self.sphere_contribution(s, p))
            .map(|(v, _)| v)
            .sum()
    }

    /// Outward surface normal at `p`, the normalized negative field gradient.
    pub fn normal(&self, p: Vec3) -> Vec3 {
        let gradient: Vec3 = self
            .spheres
            .iter()
            .filter_map(|s| self.sphere_contribution(s, p))
            .map(|(_, g)| g)
            .sum();
        (-gradient).normalize_or_zero()
    }

    /// `true` where the field reaches the threshold.
    pub fn contains(&self, p: Vec3) -> bool {
        self.field(p) >= self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_ball() -> ImplicitSurfaceProxy {
        let mut proxy = ImplicitSurfaceProxy::default();
        proxy.add_sphere(BoundingSphere {
            center: Vec3::ZERO,
            radius: 1.0,
        });
        proxy
    }

    #[test]
    fn test_field_profile() {
        let proxy = unit_ball();
        assert!((proxy.field(Vec3::ZERO) - DEFAULT_STIFFNESS).abs() < 1e-6);
        assert_eq!(proxy.field(Vec3::X * 1.5), 0.0);
        assert!(proxy.contains(Vec3::ZERO));
        assert!(!proxy.contains(Vec3::X * 0.9));
    }

    #[test]
    fn test_normal_points_outward() {
        let proxy = unit_ball();
        let n = proxy.normal(Vec3::new(0.3, 0.0, 0.0));
        assert!((n - Vec3::X).length() < 1e-5);
        assert_eq!(proxy.normal(Vec3::ZERO), Vec3::ZERO);
    }

    #[test]
    fn test_iso_radius_on_threshold() {
        let proxy = unit_ball();
        let r = proxy.iso_radius(&proxy.spheres[0]).unwrap();
        assert!((proxy.field(Vec3::X * r) - DEFAULT_THRESHOLD).abs() < 1e-4);
        assert_eq!(proxy.min_iso_radius(), Some(r));

        let unreachable = ImplicitSurfaceProxy {
            threshold: 3.0,
            ..unit_ball()
        };
        assert_eq!(unreachable.min_iso_radius(), None);
    }

    #[test]
    fn test_bounds() {
        let mut proxy = unit_ball();
        proxy.add_sphere(BoundingSphere {
            center: Vec3::new(3.0, 0.0, 0.0),
            radius: 0.5,
        });
        let (lo, hi) = proxy.bounds().unwrap();
        assert_eq!(lo, Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(hi, Vec3::new(3.5, 1.0, 1.0));
        assert!(ImplicitSurfaceProxy::default().bounds().is_none());
    }
}
