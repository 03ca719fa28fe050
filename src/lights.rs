//! Scene lights and the registry that hands them to the light buffer.

use glam::{Vec3, Vec4};
use log::debug;

use crate::error::{LightError, LightKind};

/// Capacity of the directional array in the `Lights` uniform block.
pub const MAX_DIRECTIONAL_LIGHTS: usize = 4;
/// Capacity of the point/spot array in the `Lights` uniform block.
pub const MAX_PUNCTUAL_LIGHTS: usize = 32;

/// Cone angle (degrees) that means "no angular attenuation".
pub const FULL_SPHERE_DEG: f32 = 360.0;

const SPOT_EPSILON: f32 = 1e-4;

/// Light arriving from infinitely far away along `direction`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Expected to be unit length; never normalized here.
    pub direction: Vec3,
    /// Linear RGB intensity, unbounded.
    pub color: Vec3,
}

impl DirectionalLight {
    pub fn new(direction: Vec3, color: Vec3) -> Self {
        Self { direction, color }
    }
}

/// Precomputed cone falloff so the shader can evaluate
/// `clamp(dot(light_dir, spot_dir) * scale + offset, 0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotCone {
    pub scale: f32,
    pub offset: f32,
}

impl SpotCone {
    /// Evaluates to 1 for every direction.
    pub const UNATTENUATED: Self = Self {
        scale: 0.0,
        offset: 1.0,
    };

    /// Derives the falloff terms from full cone angles in degrees.
    ///
    /// An `outer_deg` of [`FULL_SPHERE_DEG`] (or more) is the point-light
    /// sentinel and yields [`SpotCone::UNATTENUATED`]. When the two angles
    /// are (nearly) equal the range is clamped, producing a hard edge.
    pub fn from_angles(inner_deg: f32, outer_deg: f32) -> Self {
        if outer_deg >= FULL_SPHERE_DEG {
            return Self::UNATTENUATED;
        }
        let outer_cos = (outer_deg.to_radians() * 0.5).cos();
        let inner_cos = (inner_deg.to_radians() * 0.5).cos();
        let inv_range = 1.0 / (inner_cos - outer_cos).max(SPOT_EPSILON);
        Self {
            scale: inv_range,
            offset: -outer_cos * inv_range,
        }
    }

    /// Attenuation for a given cosine between light and spot direction.
    pub fn attenuation(&self, cos_theta: f32) -> f32 {
        (cos_theta * self.scale + self.offset).clamp(0.0, 1.0)
    }
}

/// Point or spot light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PunctualLight {
    /// World-space position in xyz. `w` is reserved for the shading stage
    /// and passed through untouched.
    pub position: Vec4,
    pub color: Vec3,
    /// Only meaningful for spot lights.
    pub direction: Vec3,
    pub cone: SpotCone,
}

impl PunctualLight {
    /// Omnidirectional light (cone angles set to the 360° sentinel).
    pub fn point(position: Vec4, color: Vec3) -> Self {
        Self {
            position,
            color,
            direction: Vec3::X,
            cone: SpotCone::from_angles(FULL_SPHERE_DEG, FULL_SPHERE_DEG),
        }
    }

    /// Spot light with full inner/outer cone angles in degrees.
    pub fn spot(
        position: Vec4,
        color: Vec3,
        direction: Vec3,
        inner_deg: f32,
        outer_deg: f32,
    ) -> Self {
        Self {
            position,
            color,
            direction,
            cone: SpotCone::from_angles(inner_deg, outer_deg),
        }
    }
}

/// Stable handle returned by [`LightRegistry::attach_directional`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirectionalLightId(usize);

/// Stable handle returned by [`LightRegistry::attach_punctual`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PunctualLightId(usize);

impl DirectionalLightId {
    pub fn slot(self) -> usize {
        self.0
    }
}

impl PunctualLightId {
    pub fn slot(self) -> usize {
        self.0
    }
}

/// Ordered, capacity-limited light storage.
///
/// Insertion order is the slot order in the GPU arrays. Lights are only
/// ever appended, so handles stay valid for the registry's lifetime.
#[derive(Debug, Clone, Default)]
pub struct LightRegistry {
    directional: Vec<DirectionalLight>,
    punctual: Vec<PunctualLight>,
}

impl LightRegistry {
    pub fn new() -> Self {
        Self {
            directional: Vec::with_capacity(MAX_DIRECTIONAL_LIGHTS),
            punctual: Vec::with_capacity(MAX_PUNCTUAL_LIGHTS),
        }
    }

    /// Appends a directional light.
    ///
    /// # Panics
    ///
    /// Panics when [`MAX_DIRECTIONAL_LIGHTS`] lights are already attached.
    pub fn attach_directional(&mut self, light: DirectionalLight) -> DirectionalLightId {
        match self.try_attach_directional(light) {
            Ok(id) => id,
            Err(err) => panic!("{err}"),
        }
    }

    /// Appends a punctual light.
    ///
    /// # Panics
    ///
    /// Panics when [`MAX_PUNCTUAL_LIGHTS`] lights are already attached.
    pub fn attach_punctual(&mut self, light: PunctualLight) -> PunctualLightId {
        match self.try_attach_punctual(light) {
            Ok(id) => id,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_attach_directional(
        &mut self,
        light: DirectionalLight,
    ) -> Result<DirectionalLightId, LightError> {
        if self.directional.len() >= MAX_DIRECTIONAL_LIGHTS {
            return Err(LightError::CapacityExceeded {
                kind: LightKind::Directional,
                max: MAX_DIRECTIONAL_LIGHTS,
            });
        }
        let id = DirectionalLightId(self.directional.len());
        debug!("attached directional light {} {:?}", id.0, light.direction);
        self.directional.push(light);
        Ok(id)
    }

    pub fn try_attach_punctual(
        &mut self,
        light: PunctualLight,
    ) -> Result<PunctualLightId, LightError> {
        if self.punctual.len() >= MAX_PUNCTUAL_LIGHTS {
            return Err(LightError::CapacityExceeded {
                kind: LightKind::Punctual,
                max: MAX_PUNCTUAL_LIGHTS,
            });
        }
        let id = PunctualLightId(self.punctual.len());
        debug!("attached punctual light {} at {:?}", id.0, light.position);
        self.punctual.push(light);
        Ok(id)
    }

    pub fn directional_lights(&self) -> &[DirectionalLight] {
        &self.directional
    }

    pub fn punctual_lights(&self) -> &[PunctualLight] {
        &self.punctual
    }

    pub fn directional_light(&self, id: DirectionalLightId) -> Option<&DirectionalLight> {
        self.directional.get(id.0)
    }

    pub fn directional_light_mut(&mut self, id: DirectionalLightId) -> Option<&mut DirectionalLight> {
        self.directional.get_mut(id.0)
    }

    pub fn punctual_light(&self, id: PunctualLightId) -> Option<&PunctualLight> {
        self.punctual.get(id.0)
    }

    pub fn punctual_light_mut(&mut self, id: PunctualLightId) -> Option<&mut PunctualLight> {
        self.punctual.get_mut(id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white_point(x: f32) -> PunctualLight {
        PunctualLight::point(Vec4::new(x, 0.0, 0.0, 0.1), Vec3::ONE)
    }

    #[test]
    fn point_light_cone_never_attenuates() {
        let light = white_point(0.0);
        let cone = light.cone;
        for step in 0..=200 {
            let cos_theta = -1.0 + step as f32 * 0.01;
            assert!(cos_theta * cone.scale + cone.offset >= 1.0, "cos {cos_theta}");
        }
        assert_eq!(cone.attenuation(-1.0), 1.0);
    }

    #[test]
    fn spot_cone_matches_derivation() {
        let cone = SpotCone::from_angles(25.0, 30.0);
        let outer = (15.0f32).to_radians().cos();
        let inner = (12.5f32).to_radians().cos();
        let inv = 1.0 / (inner - outer);
        assert!((cone.scale - inv).abs() < 1e-2);
        assert!((cone.offset + outer * inv).abs() < 1e-2);

        assert_eq!(cone.attenuation(outer - 0.01), 0.0);
        assert_eq!(cone.attenuation(1.0), 1.0);
        let mid = cone.attenuation((outer + inner) * 0.5);
        assert!((mid - 0.5).abs() < 1e-2);
    }

    #[test]
    fn equal_angles_give_hard_edge() {
        let cone = SpotCone::from_angles(40.0, 40.0);
        assert!((cone.scale - 1.0 / SPOT_EPSILON).abs() < 1.0);
        let edge = (20.0f32).to_radians().cos();
        assert_eq!(cone.attenuation(edge - 0.001), 0.0);
        assert_eq!(cone.attenuation(edge + 0.001), 1.0);
    }

    #[test]
    fn fifth_directional_light_is_rejected() {
        let mut registry = LightRegistry::new();
        for _ in 0..MAX_DIRECTIONAL_LIGHTS {
            registry.attach_directional(DirectionalLight::new(Vec3::NEG_Y, Vec3::ONE));
        }
        let err = registry
            .try_attach_directional(DirectionalLight::new(Vec3::NEG_Y, Vec3::ONE))
            .unwrap_err();
        assert_eq!(
            err,
            LightError::CapacityExceeded {
                kind: LightKind::Directional,
                max: 4
            }
        );
        assert_eq!(registry.directional_lights().len(), MAX_DIRECTIONAL_LIGHTS);
    }

    #[test]
    #[should_panic(expected = "cannot attach more than 4 directional lights")]
    fn fifth_directional_light_panics() {
        let mut registry = LightRegistry::new();
        for _ in 0..=MAX_DIRECTIONAL_LIGHTS {
            registry.attach_directional(DirectionalLight::new(Vec3::NEG_Y, Vec3::ONE));
        }
    }

    #[test]
    #[should_panic(expected = "cannot attach more than 32 punctual lights")]
    fn thirty_third_punctual_light_panics() {
        let mut registry = LightRegistry::new();
        for i in 0..=MAX_PUNCTUAL_LIGHTS {
            registry.attach_punctual(white_point(i as f32));
        }
    }

    #[test]
    fn handles_keep_insertion_order_and_allow_mutation() {
        let mut registry = LightRegistry::new();
        let first = registry.attach_punctual(white_point(1.0));
        let second = registry.attach_punctual(white_point(2.0));
        assert_eq!((first.slot(), second.slot()), (0, 1));

        registry.punctual_light_mut(first).unwrap().position.z = 9.0;
        for i in 3..20 {
            registry.attach_punctual(white_point(i as f32));
        }
        assert_eq!(registry.punctual_light(first).unwrap().position.z, 9.0);
        assert_eq!(registry.punctual_lights()[1].position.x, 2.0);
    }

    #[test]
    fn directional_handles_allow_mutation() {
        let mut registry = LightRegistry::new();
        let sun = registry.attach_directional(DirectionalLight::new(Vec3::NEG_Y, Vec3::ONE));
        let fill = registry.attach_directional(DirectionalLight::new(Vec3::X, Vec3::splat(0.2)));
        assert_eq!(fill.slot(), 1);

        registry.directional_light_mut(sun).unwrap().color = Vec3::new(1.0, 0.9, 0.7);
        assert_eq!(registry.directional_light(sun).unwrap().color, Vec3::new(1.0, 0.9, 0.7));
        assert_eq!(registry.directional_lights()[1].direction, Vec3::X);
    }
}
