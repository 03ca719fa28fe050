//! std140 packing of the light registry into the `Lights` uniform block.
//!
//! The block is allocated once at its full size. Every sync rewrites the
//! header and the populated slots only; the shading stage must use the
//! counts in the header to know how many entries are valid.
//!
//! ```text
//! offset  size  field
//!      0    16  directional_count: i32, punctual_count: i32, 8 unused bytes
//!     16   128  directional[4]  { direction: vec3 (16), color: vec3 (16) }
//!    144  2048  punctual[32]    { position: vec4, color: vec3 (16),
//!                                 direction: vec3 (16), spot: vec2 (16) }
//! ```

use bytemuck::{bytes_of, cast_slice, Pod, Zeroable};
use log::{info, trace};

use crate::error::{GpuError, GpuResult};
use crate::gpu::{BufferId, BufferUsage, GraphicsDevice, ShaderProgram};
use crate::lights::{
    DirectionalLight, LightRegistry, PunctualLight, MAX_DIRECTIONAL_LIGHTS, MAX_PUNCTUAL_LIGHTS,
};

/// Name of the uniform block type declared by shading programs.
pub const LIGHT_BLOCK_NAME: &str = "Lights";
/// Binding point reserved process-wide for the light block.
pub const LIGHT_BLOCK_BINDING: u32 = 0;

pub const HEADER_OFFSET: u64 = 0;
pub const DIRECTIONAL_OFFSET: u64 = HEADER_OFFSET + std::mem::size_of::<LightHeader>() as u64;
pub const PUNCTUAL_OFFSET: u64 = DIRECTIONAL_OFFSET
    + (MAX_DIRECTIONAL_LIGHTS * std::mem::size_of::<GpuDirectionalLight>()) as u64;
pub const LIGHT_BLOCK_SIZE: u64 =
    PUNCTUAL_OFFSET + (MAX_PUNCTUAL_LIGHTS * std::mem::size_of::<GpuPunctualLight>()) as u64;

const _: () = assert!(std::mem::size_of::<LightHeader>() == 16);
const _: () = assert!(std::mem::size_of::<GpuDirectionalLight>() == 32);
const _: () = assert!(std::mem::size_of::<GpuPunctualLight>() == 64);
const _: () = assert!(LIGHT_BLOCK_SIZE == 2192);

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightHeader {
    pub directional_count: i32,
    pub punctual_count: i32,
    _unused: [i32; 2],
}

impl LightHeader {
    pub fn new(directional_count: usize, punctual_count: usize) -> Self {
        Self {
            directional_count: directional_count as i32,
            punctual_count: punctual_count as i32,
            _unused: [0; 2],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuDirectionalLight {
    pub direction: [f32; 4],
    pub color: [f32; 4],
}

impl From<&DirectionalLight> for GpuDirectionalLight {
    fn from(light: &DirectionalLight) -> Self {
        Self {
            direction: light.direction.extend(0.0).to_array(),
            color: light.color.extend(0.0).to_array(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuPunctualLight {
    pub position: [f32; 4],
    pub color: [f32; 4],
    pub direction: [f32; 4],
    /// `[scale, offset, 0, 0]`
    pub spot: [f32; 4],
}

impl From<&PunctualLight> for GpuPunctualLight {
    fn from(light: &PunctualLight) -> Self {
        Self {
            position: light.position.to_array(),
            color: light.color.extend(0.0).to_array(),
            direction: light.direction.extend(0.0).to_array(),
            spot: [light.cone.scale, light.cone.offset, 0.0, 0.0],
        }
    }
}

/// Owner of the device-side `Lights` buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightBufferPacker {
    buffer: BufferId,
}

impl LightBufferPacker {
    /// Allocates the full-size block once.
    pub fn new<D: GraphicsDevice + ?Sized>(device: &mut D) -> Self {
        let buffer = device.create_buffer("lights-block", LIGHT_BLOCK_SIZE, BufferUsage::Uniform);
        Self { buffer }
    }

    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    /// Associates the program's `Lights` block with the reserved binding
    /// point and attaches the shared buffer to it. Needed once per program.
    pub fn bind_to_shader<D, P>(&self, device: &mut D, program: &mut P) -> GpuResult<()>
    where
        D: GraphicsDevice + ?Sized,
        P: ShaderProgram + ?Sized,
    {
        let index = program
            .uniform_block_index(LIGHT_BLOCK_NAME)
            .ok_or_else(|| GpuError::MissingUniformBlock {
                program: program.label().to_string(),
                block: LIGHT_BLOCK_NAME.to_string(),
            })?;
        program.bind_uniform_block(index, LIGHT_BLOCK_BINDING)?;
        device.bind_buffer_base(LIGHT_BLOCK_BINDING, self.buffer)?;
        info!(
            "bound {LIGHT_BLOCK_NAME} block of `{}` to binding {LIGHT_BLOCK_BINDING}",
            program.label()
        );
        Ok(())
    }

    /// Writes the header and every populated slot. Unpopulated slots keep
    /// their previous bytes.
    pub fn sync_to_device<D: GraphicsDevice + ?Sized>(
        &self,
        registry: &LightRegistry,
        device: &mut D,
    ) -> GpuResult<()> {
        let directional: Vec<GpuDirectionalLight> = registry
            .directional_lights()
            .iter()
            .map(GpuDirectionalLight::from)
            .collect();
        let punctual: Vec<GpuPunctualLight> = registry
            .punctual_lights()
            .iter()
            .map(GpuPunctualLight::from)
            .collect();

        let header = LightHeader::new(directional.len(), punctual.len());
        device.write_buffer(self.buffer, HEADER_OFFSET, bytes_of(&header))?;
        if !directional.is_empty() {
            device.write_buffer(self.buffer, DIRECTIONAL_OFFSET, cast_slice(&directional))?;
        }
        if !punctual.is_empty() {
            device.write_buffer(self.buffer, PUNCTUAL_OFFSET, cast_slice(&punctual))?;
        }
        trace!(
            "synced {} directional and {} punctual lights",
            header.directional_count,
            header.punctual_count
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bytemuck::pod_read_unaligned;
    use glam::{Vec3, Vec4};

    use super::*;
    use crate::gpu::{HeadlessDevice, HeadlessProgram};

    fn header(bytes: &[u8]) -> LightHeader {
        pod_read_unaligned(&bytes[..16])
    }

    fn punctual_slot(bytes: &[u8], slot: usize) -> GpuPunctualLight {
        let start = PUNCTUAL_OFFSET as usize + slot * 64;
        pod_read_unaligned(&bytes[start..start + 64])
    }

    #[test]
    fn block_offsets_follow_std140() {
        assert_eq!(DIRECTIONAL_OFFSET, 16);
        assert_eq!(PUNCTUAL_OFFSET, 144);
        assert_eq!(LIGHT_BLOCK_SIZE, 2192);
    }

    #[test]
    fn allocates_full_block_once() {
        let mut device = HeadlessDevice::new();
        let packer = LightBufferPacker::new(&mut device);
        assert_eq!(device.buffer_count(), 1);
        assert_eq!(device.contents(packer.buffer()).unwrap().len(), 2192);
    }

    #[test]
    fn full_punctual_array_syncs() {
        let mut device = HeadlessDevice::new();
        let packer = LightBufferPacker::new(&mut device);
        let mut registry = LightRegistry::new();
        registry.attach_directional(DirectionalLight::new(Vec3::NEG_Y, Vec3::splat(0.5)));
        for i in 0..MAX_PUNCTUAL_LIGHTS {
            registry.attach_punctual(PunctualLight::point(
                Vec4::new(i as f32, 1.0, 2.0, 0.0),
                Vec3::ONE,
            ));
        }
        packer.sync_to_device(&registry, &mut device).unwrap();

        let bytes = device.contents(packer.buffer()).unwrap();
        let header = header(bytes);
        assert_eq!(header.directional_count, 1);
        assert_eq!(header.punctual_count, 32);
        assert_eq!(punctual_slot(bytes, 31).position, [31.0, 1.0, 2.0, 0.0]);
    }

    #[test]
    fn records_are_written_at_fixed_offsets() {
        let mut device = HeadlessDevice::new();
        let packer = LightBufferPacker::new(&mut device);
        let mut registry = LightRegistry::new();
        registry.attach_directional(DirectionalLight::new(
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(0.2, 0.3, 0.4),
        ));
        let spot = PunctualLight::spot(
            Vec4::new(0.0, 0.5, 5.0, 0.02),
            Vec3::splat(20.0),
            Vec3::NEG_Z,
            25.0,
            30.0,
        );
        registry.attach_punctual(spot);
        packer.sync_to_device(&registry, &mut device).unwrap();

        let bytes = device.contents(packer.buffer()).unwrap();
        let directional: GpuDirectionalLight = pod_read_unaligned(&bytes[16..48]);
        assert_eq!(directional.direction, [0.0, -1.0, 0.0, 0.0]);
        assert_eq!(directional.color, [0.2, 0.3, 0.4, 0.0]);

        let record = punctual_slot(bytes, 0);
        assert_eq!(record.color, [20.0, 20.0, 20.0, 0.0]);
        assert_eq!(record.direction, [0.0, 0.0, -1.0, 0.0]);
        assert_eq!(record.spot, [spot.cone.scale, spot.cone.offset, 0.0, 0.0]);
    }

    #[test]
    fn reserved_w_round_trips_unchanged() {
        let mut device = HeadlessDevice::new();
        let packer = LightBufferPacker::new(&mut device);
        let mut registry = LightRegistry::new();
        let w = 1.0 / 10.0;
        registry.attach_punctual(PunctualLight::point(Vec4::new(1.2, 0.5, 1.5, w), Vec3::ONE));
        packer.sync_to_device(&registry, &mut device).unwrap();

        let record = punctual_slot(device.contents(packer.buffer()).unwrap(), 0);
        assert_eq!(record.position[3].to_bits(), w.to_bits());
    }

    #[test]
    fn unpopulated_slots_are_left_untouched() {
        let mut device = HeadlessDevice::new();
        let packer = LightBufferPacker::new(&mut device);
        device
            .write_buffer(packer.buffer(), 0, &[0xAB; LIGHT_BLOCK_SIZE as usize])
            .unwrap();

        let mut registry = LightRegistry::new();
        registry.attach_punctual(PunctualLight::point(Vec4::ZERO, Vec3::ONE));
        packer.sync_to_device(&registry, &mut device).unwrap();

        let bytes = device.contents(packer.buffer()).unwrap();
        assert!(bytes[16..144].iter().all(|&b| b == 0xAB));
        let second_slot = PUNCTUAL_OFFSET as usize + 64;
        assert!(bytes[second_slot..].iter().all(|&b| b == 0xAB));
        assert_eq!(header(bytes).punctual_count, 1);
    }

    #[test]
    fn animated_position_is_picked_up_by_next_sync() {
        let mut device = HeadlessDevice::new();
        let packer = LightBufferPacker::new(&mut device);
        let mut registry = LightRegistry::new();
        let id = registry.attach_punctual(PunctualLight::point(Vec4::ZERO, Vec3::ONE));
        packer.sync_to_device(&registry, &mut device).unwrap();

        registry.punctual_light_mut(id).unwrap().position.x = 2.0;
        packer.sync_to_device(&registry, &mut device).unwrap();
        let record = punctual_slot(device.contents(packer.buffer()).unwrap(), 0);
        assert_eq!(record.position[0], 2.0);
    }

    #[test]
    fn binding_is_per_program_with_shared_storage() {
        let mut device = HeadlessDevice::new();
        let packer = LightBufferPacker::new(&mut device);
        let mut phong = HeadlessProgram::new("phong").with_block("Camera").with_block("Lights");
        let mut lamp = HeadlessProgram::new("lamp").with_block("Lights");

        packer.bind_to_shader(&mut device, &mut phong).unwrap();
        packer.bind_to_shader(&mut device, &mut lamp).unwrap();

        assert_eq!(phong.block_binding("Lights"), Some(LIGHT_BLOCK_BINDING));
        assert_eq!(lamp.block_binding("Lights"), Some(LIGHT_BLOCK_BINDING));
        assert_eq!(phong.block_binding("Camera"), None);
        assert_eq!(device.bound_buffer(LIGHT_BLOCK_BINDING), Some(packer.buffer()));
    }

    #[test]
    fn missing_block_fails_binding() {
        let mut device = HeadlessDevice::new();
        let packer = LightBufferPacker::new(&mut device);
        let mut program = HeadlessProgram::new("skybox").with_block("Camera");
        let err = packer.bind_to_shader(&mut device, &mut program).unwrap_err();
        assert_eq!(
            err,
            GpuError::MissingUniformBlock {
                program: "skybox".into(),
                block: "Lights".into()
            }
        );
        assert_eq!(device.bound_buffer(LIGHT_BLOCK_BINDING), None);
    }
}
