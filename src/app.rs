//! Per-frame orchestration of input, camera, lights and the light buffer.

use std::f32::consts::PI;

use anyhow::{Context, Result};
use glam::{Mat4, Vec3};
use log::{debug, info};

use crate::camera::FlyCamera;
use crate::error::GpuResult;
use crate::gpu::{GraphicsDevice, ShaderProgram, UniformValue};
use crate::input::InputState;
use crate::light_buffer::LightBufferPacker;
use crate::lights::{LightRegistry, PunctualLightId};
use crate::scene::SceneDescription;

/// Angular speed of orbiting lights in radians per second.
pub const ORBIT_ANGULAR_SPEED: f32 = 0.25 * PI;
pub const DEFAULT_EXPOSURE: f32 = 1.0;

/// Moves a punctual light along a circle around the world y axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightAnimation {
    pub light: PunctualLightId,
    pub radius: f32,
    pub angular_speed: f32,
}

impl LightAnimation {
    pub fn orbit(light: PunctualLightId, radius: f32) -> Self {
        Self {
            light,
            radius,
            angular_speed: ORBIT_ANGULAR_SPEED,
        }
    }

    /// Rewrites x and z for time `t`; y and the reserved w are kept.
    fn apply(&self, lights: &mut LightRegistry, t: f32) {
        if let Some(light) = lights.punctual_light_mut(self.light) {
            let angle = self.angular_speed * t;
            light.position.x = self.radius * angle.cos();
            light.position.z = self.radius * angle.sin();
        }
    }
}

/// Camera-dependent values pushed to every shading program each frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub view: Mat4,
    pub projection: Mat4,
    pub camera_position: Vec3,
    pub exposure: f32,
}

impl FrameUniforms {
    /// Assigns the uniforms the program declares and skips the rest.
    pub fn apply_to<P: ShaderProgram + ?Sized>(&self, program: &mut P) {
        let values = [
            ("view", UniformValue::Mat4(self.view)),
            ("projection", UniformValue::Mat4(self.projection)),
            ("camera_position", UniformValue::Vec3(self.camera_position)),
            ("exposure", UniformValue::Float(self.exposure)),
        ];
        for (name, value) in values {
            if !program.set_uniform(name, value) {
                debug!("program `{}` has no uniform `{name}`", program.label());
            }
        }
    }
}

/// Owns the camera, the lights and the light buffer for one scene.
///
/// Within [`FrameDriver::update`] input is applied first, then light
/// animation, then the buffer sync, so draws never see stale state.
#[derive(Debug)]
pub struct FrameDriver {
    camera: FlyCamera,
    lights: LightRegistry,
    packer: LightBufferPacker,
    input: InputState,
    animations: Vec<LightAnimation>,
    elapsed: f32,
    exposure: f32,
}

impl FrameDriver {
    /// Builds the scene's camera and lights and allocates the light block.
    pub fn new<D: GraphicsDevice + ?Sized>(
        scene: &SceneDescription,
        device: &mut D,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let mut camera = FlyCamera::new(scene.camera.position, scene.camera.up, width, height.max(1));
        camera.set_movement_speed(scene.camera.speed);
        camera.set_mouse_sensitivity(scene.camera.sensitivity);

        let mut lights = LightRegistry::new();
        for light in &scene.directional_lights {
            lights
                .try_attach_directional(*light)
                .context("scene defines too many directional lights")?;
        }
        let mut animations = Vec::new();
        for setup in &scene.punctual_lights {
            let id = lights
                .try_attach_punctual(setup.light)
                .context("scene defines too many point/spot lights")?;
            if let Some(radius) = setup.orbit {
                animations.push(LightAnimation::orbit(id, radius));
            }
        }
        info!(
            "scene has {} directional and {} punctual lights ({} animated)",
            lights.directional_lights().len(),
            lights.punctual_lights().len(),
            animations.len()
        );

        let packer = LightBufferPacker::new(device);
        Ok(Self {
            camera,
            lights,
            packer,
            input: InputState::new(),
            animations,
            elapsed: 0.0,
            exposure: scene.exposure,
        })
    }

    /// Shares the light block with another shading program.
    pub fn bind_program<D, P>(&self, device: &mut D, program: &mut P) -> GpuResult<()>
    where
        D: GraphicsDevice + ?Sized,
        P: ShaderProgram + ?Sized,
    {
        self.packer.bind_to_shader(device, program)
    }

    /// Forwards a viewport change to the camera; zero-height (minimized)
    /// viewports are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if height == 0 {
            return;
        }
        self.camera.resize(width, height);
    }

    /// Advances one frame of `delta_time` seconds and syncs the lights.
    pub fn update<D: GraphicsDevice + ?Sized>(
        &mut self,
        delta_time: f32,
        device: &mut D,
    ) -> GpuResult<FrameUniforms> {
        self.apply_input(delta_time);

        self.elapsed += delta_time;
        for animation in &self.animations {
            animation.apply(&mut self.lights, self.elapsed);
        }

        self.packer.sync_to_device(&self.lights, device)?;

        Ok(FrameUniforms {
            view: self.camera.view_matrix(),
            projection: self.camera.projection_matrix(),
            camera_position: self.camera.position(),
            exposure: self.exposure,
        })
    }

    fn apply_input(&mut self, delta_time: f32) {
        if let Some(direction) = self.input.movement_direction() {
            self.camera.move_by(direction, delta_time);
        }
        let look = self.input.take_look_offset();
        if look != glam::Vec2::ZERO {
            self.camera.look(look.x, look.y, true);
        }
        let scroll = self.input.take_scroll();
        if scroll != 0.0 {
            self.camera.zoom_by(scroll);
        }
    }

    pub fn camera(&self) -> &FlyCamera {
        &self.camera
    }

    pub fn lights(&self) -> &LightRegistry {
        &self.lights
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    pub fn packer(&self) -> &LightBufferPacker {
        &self.packer
    }

    pub fn exposure(&self) -> f32 {
        self.exposure
    }
}
