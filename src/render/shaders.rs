// The scene and lamp programs share the `Lights` declaration, which must
// mirror the std140 records in `light_buffer`. Both write linear HDR color
// into the off-screen target; `SCREEN_SHADER` tone maps it to the surface.

pub(crate) const SCENE_SHADER: &str = r#"
struct DirectionalLight {
    direction: vec4<f32>,
    color: vec4<f32>,
}

struct PunctualLight {
    position: vec4<f32>,
    color: vec4<f32>,
    direction: vec4<f32>,
    spot: vec4<f32>,
}

struct Lights {
    directional_count: i32,
    punctual_count: i32,
    directional: array<DirectionalLight, 4>,
    punctual: array<PunctualLight, 32>,
}

struct Camera {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    position: vec4<f32>,
}

struct Object {
    model: mat4x4<f32>,
    normal: mat3x4<f32>,
    color_shininess: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> lights: Lights;

@group(1) @binding(0)
var<uniform> camera: Camera;

@group(2) @binding(0)
var<uniform> object: Object;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world_position = object.model * vec4<f32>(input.position, 1.0);
    out.position = camera.projection * camera.view * world_position;
    out.world_pos = world_position.xyz;

    let world_normal = mat3x3<f32>(
        object.normal[0].xyz,
        object.normal[1].xyz,
        object.normal[2].xyz
    ) * input.normal;

    out.normal = normalize(world_normal);
    return out;
}

fn blinn_phong(
    radiance: vec3<f32>,
    to_light: vec3<f32>,
    normal: vec3<f32>,
    to_eye: vec3<f32>,
    albedo: vec3<f32>,
    shininess: f32,
) -> vec3<f32> {
    let diffuse = max(dot(normal, to_light), 0.0);
    if (diffuse <= 0.0) {
        return vec3<f32>(0.0);
    }
    let halfway = normalize(to_light + to_eye);
    let specular = pow(max(dot(normal, halfway), 0.0), shininess);
    return radiance * (albedo * diffuse + vec3<f32>(0.3) * specular);
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let normal = normalize(input.normal);
    let to_eye = normalize(camera.position.xyz - input.world_pos);
    let albedo = object.color_shininess.rgb;
    let shininess = object.color_shininess.w;

    var color = albedo * 0.03;

    for (var i: i32 = 0; i < lights.directional_count; i = i + 1) {
        let light = lights.directional[i];
        let to_light = normalize(-light.direction.xyz);
        color = color + blinn_phong(light.color.rgb, to_light, normal, to_eye, albedo, shininess);
    }

    for (var i: i32 = 0; i < lights.punctual_count; i = i + 1) {
        let light = lights.punctual[i];
        let offset = light.position.xyz - input.world_pos;
        let distance_sq = max(dot(offset, offset), 1e-4);
        let to_light = offset * inverseSqrt(distance_sq);
        let cone = clamp(dot(-to_light, light.direction.xyz) * light.spot.x + light.spot.y, 0.0, 1.0);
        let radiance = light.color.rgb * (cone * cone / distance_sq);
        color = color + blinn_phong(radiance, to_light, normal, to_eye, albedo, shininess);
    }

    return vec4<f32>(color, 1.0);
}
"#;

pub(crate) const LAMP_SHADER: &str = r#"
struct DirectionalLight {
    direction: vec4<f32>,
    color: vec4<f32>,
}

struct PunctualLight {
    position: vec4<f32>,
    color: vec4<f32>,
    direction: vec4<f32>,
    spot: vec4<f32>,
}

struct Lights {
    directional_count: i32,
    punctual_count: i32,
    directional: array<DirectionalLight, 4>,
    punctual: array<PunctualLight, 32>,
}

struct Camera {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    position: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> lights: Lights;

@group(1) @binding(0)
var<uniform> camera: Camera;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec3<f32>,
}

// One instance per punctual light.
@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @builtin(instance_index) instance: u32,
) -> VertexOutput {
    var out: VertexOutput;
    let light = lights.punctual[instance];
    let world_position = light.position.xyz + position * 0.1;
    out.position = camera.projection * camera.view * vec4<f32>(world_position, 1.0);
    let peak = max(max(light.color.r, light.color.g), max(light.color.b, 1.0));
    out.color = light.color.rgb / peak;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(input.color, 1.0);
}
"#;

pub(crate) const SCREEN_SHADER: &str = r#"
struct Screen {
    exposure: vec4<f32>,
}

@group(0) @binding(0)
var hdr_color: texture_2d<f32>;

@group(0) @binding(1)
var hdr_sampler: sampler;

@group(1) @binding(0)
var<uniform> screen: Screen;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

// One triangle that covers the whole viewport.
@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    let corner = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: VertexOutput;
    out.position = vec4<f32>(corner * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(corner.x, 1.0 - corner.y);
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let hdr = textureSample(hdr_color, hdr_sampler, input.uv).rgb;
    let mapped = vec3<f32>(1.0) - exp(-hdr * screen.exposure.x);
    return vec4<f32>(mapped, 1.0);
}
"#;
