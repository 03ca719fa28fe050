use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use glam::{Vec3, Vec4};
use roxmltree::{Document, Node};

use crate::app::DEFAULT_EXPOSURE;
use crate::camera::{DEFAULT_SENSITIVITY, DEFAULT_SPEED};
use crate::lights::{DirectionalLight, PunctualLight, FULL_SPHERE_DEG};

/// Scene as described by a scene XML file.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneDescription {
    pub camera: CameraSetup,
    pub directional_lights: Vec<DirectionalLight>,
    pub punctual_lights: Vec<PunctualSetup>,
    pub objects: Vec<SceneObject>,
    /// Scale applied to HDR radiance before tone mapping.
    pub exposure: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSetup {
    pub position: Vec3,
    pub up: Vec3,
    pub speed: f32,
    pub sensitivity: f32,
}

impl Default for CameraSetup {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1.0, 5.0),
            up: Vec3::Y,
            speed: DEFAULT_SPEED,
            sensitivity: DEFAULT_SENSITIVITY,
        }
    }
}

/// A point or spot light plus its optional animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PunctualSetup {
    pub light: PunctualLight,
    /// Radius of a circular path around the y axis.
    pub orbit: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MeshSource {
    Cube,
    Plane,
    Obj(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub name: String,
    pub mesh: MeshSource,
    pub position: Vec3,
    pub scale: Vec3,
    pub color: Vec3,
    pub shininess: f32,
}

impl SceneDescription {
    /// The demo scene used when no scene file is given: an orbiting point
    /// light, a spot light aimed down -Z, a floor and a cube.
    pub fn builtin() -> Self {
        Self {
            camera: CameraSetup::default(),
            directional_lights: Vec::new(),
            punctual_lights: vec![
                PunctualSetup {
                    light: PunctualLight::point(Vec4::new(1.2, 0.5, 1.5, 1.0 / 10.0), Vec3::ONE),
                    orbit: Some(2.0),
                },
                PunctualSetup {
                    light: PunctualLight::spot(
                        Vec4::new(0.0, 0.5, 5.0, 1.0 / 50.0),
                        Vec3::splat(20.0),
                        Vec3::NEG_Z,
                        25.0,
                        30.0,
                    ),
                    orbit: None,
                },
            ],
            objects: vec![
                SceneObject {
                    name: "Floor".into(),
                    mesh: MeshSource::Plane,
                    position: Vec3::new(0.0, -1.0, 0.0),
                    scale: Vec3::new(10.0, 1.0, 10.0),
                    color: Vec3::new(0.55, 0.4, 0.25),
                    shininess: 64.0,
                },
                SceneObject {
                    name: "Crate".into(),
                    mesh: MeshSource::Cube,
                    position: Vec3::new(0.0, 1.0, 0.0),
                    scale: Vec3::splat(0.5),
                    color: Vec3::new(0.8, 0.8, 0.8),
                    shininess: 32.0,
                },
            ],
            exposure: DEFAULT_EXPOSURE,
        }
    }

    /// Loads a scene file. OBJ paths are resolved against its directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read scene {}", path.display()))?;
        let mut scene = Self::from_xml(&xml)?;
        if let Some(dir) = path.parent() {
            for object in &mut scene.objects {
                if let MeshSource::Obj(mesh) = &mut object.mesh {
                    if mesh.is_relative() {
                        *mesh = dir.join(&*mesh);
                    }
                }
            }
        }
        Ok(scene)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid scene XML")?;
        let root = document.root_element();
        if !root.has_tag_name("scene") {
            bail!("expected <scene> root element, found <{}>", root.tag_name().name());
        }

        let mut camera = CameraSetup::default();
        if let Some(node) = child(&root, "camera") {
            camera.position = parse_vec3(optional_text(&node, "position"), camera.position)?;
            camera.up = parse_vec3(optional_text(&node, "up"), camera.up)?;
            camera.speed = parse_f32(optional_text(&node, "speed"), camera.speed)?;
            camera.sensitivity =
                parse_f32(optional_text(&node, "sensitivity"), camera.sensitivity)?;
        }

        let exposure = parse_f32(optional_text(&root, "exposure"), DEFAULT_EXPOSURE)?;
        if !(exposure > 0.0 && exposure.is_finite()) {
            bail!("exposure must be a positive number, found {exposure}");
        }

        let mut directional_lights = Vec::new();
        let mut punctual_lights = Vec::new();
        for (index, node) in root.children().filter(|n| n.has_tag_name("light")).enumerate() {
            let kind = optional_text(&node, "type").unwrap_or_else(|| "point".to_string());
            let color = parse_vec3(optional_text(&node, "color"), Vec3::ONE)?;
            let parsed = match kind.as_str() {
                "directional" => {
                    let direction = parse_vec3(optional_text(&node, "direction"), Vec3::NEG_Y)?;
                    directional_lights.push(DirectionalLight::new(direction, color));
                    continue;
                }
                "point" => {
                    let position = parse_position(optional_text(&node, "position"))?;
                    PunctualLight::point(position, color)
                }
                "spot" => {
                    let position = parse_position(optional_text(&node, "position"))?;
                    let direction = parse_vec3(optional_text(&node, "direction"), Vec3::NEG_Z)?;
                    let outer = parse_f32(optional_text(&node, "outer"), FULL_SPHERE_DEG)?;
                    let inner = parse_f32(optional_text(&node, "inner"), outer)?;
                    PunctualLight::spot(position, color, direction, inner, outer)
                }
                other => bail!("light #{index} has unknown type `{other}`"),
            };
            let orbit = optional_text(&node, "orbit")
                .map(|text| parse_f32(Some(text), 0.0))
                .transpose()?;
            punctual_lights.push(PunctualSetup {
                light: parsed,
                orbit,
            });
        }

        let mut objects = Vec::new();
        for node in root.children().filter(|n| n.has_tag_name("object")) {
            let name = required_text(&node, "name")?;
            let mesh = match required_text(&node, "mesh")?.as_str() {
                "cube" => MeshSource::Cube,
                "plane" => MeshSource::Plane,
                path => MeshSource::Obj(PathBuf::from(path)),
            };
            objects.push(SceneObject {
                position: parse_vec3(optional_text(&node, "position"), Vec3::ZERO)
                    .with_context(|| format!("object {name}"))?,
                scale: parse_vec3(optional_text(&node, "scale"), Vec3::ONE)
                    .with_context(|| format!("object {name}"))?,
                color: parse_vec3(optional_text(&node, "color"), Vec3::ONE)
                    .with_context(|| format!("object {name}"))?,
                shininess: parse_f32(optional_text(&node, "shininess"), 32.0)
                    .with_context(|| format!("object {name}"))?,
                name,
                mesh,
            });
        }

        Ok(Self {
            camera,
            directional_lights,
            punctual_lights,
            objects,
            exposure,
        })
    }
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.has_tag_name(tag))
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|c| c.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn parse_components(value: &str) -> Result<Vec<f32>> {
    value
        .split_whitespace()
        .map(|component| {
            component
                .parse::<f32>()
                .map_err(|err| anyhow!("invalid number `{component}`: {err}"))
        })
        .collect()
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    match parse_components(&value)?.as_slice() {
        &[x, y, z] => Ok(Vec3::new(x, y, z)),
        other => bail!("expected 3 components, found {}", other.len()),
    }
}

/// Three components, or four where the last is the reserved `w`.
fn parse_position(value: Option<String>) -> Result<Vec4> {
    let Some(value) = value else {
        return Ok(Vec4::ZERO);
    };
    match parse_components(&value)?.as_slice() {
        &[x, y, z] => Ok(Vec4::new(x, y, z, 0.0)),
        &[x, y, z, w] => Ok(Vec4::new(x, y, z, w)),
        other => bail!("expected 3 or 4 position components, found {}", other.len()),
    }
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float `{value}`: {err}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lights::SpotCone;

    const SAMPLE: &str = r#"
    <scene>
        <exposure>2.5</exposure>
        <camera>
            <position>0 2 8</position>
            <speed>2.5</speed>
        </camera>
        <light>
            <type>directional</type>
            <direction>0 -1 0</direction>
            <color>0.9 0.9 0.9</color>
        </light>
        <light>
            <type>point</type>
            <position>1.2 0.5 1.5 0.1</position>
            <orbit>2</orbit>
        </light>
        <light>
            <type>spot</type>
            <position>0 0.5 5</position>
            <color>20 20 20</color>
            <outer>30</outer>
            <inner>25</inner>
        </light>
        <object>
            <name>Floor</name>
            <mesh>plane</mesh>
            <scale>10 1 10</scale>
        </object>
        <object>
            <name>Backpack</name>
            <mesh>meshes/backpack.obj</mesh>
        </object>
    </scene>
    "#;

    #[test]
    fn parse_scene_populates_camera_lights_and_objects() {
        let scene = SceneDescription::from_xml(SAMPLE).unwrap();
        assert_eq!(scene.camera.position, Vec3::new(0.0, 2.0, 8.0));
        assert_eq!(scene.camera.speed, 2.5);
        assert_eq!(scene.camera.sensitivity, DEFAULT_SENSITIVITY);
        assert_eq!(scene.exposure, 2.5);

        assert_eq!(scene.directional_lights.len(), 1);
        assert_eq!(scene.directional_lights[0].color, Vec3::splat(0.9));

        assert_eq!(scene.punctual_lights.len(), 2);
        let point = scene.punctual_lights[0];
        assert_eq!(point.light.position, Vec4::new(1.2, 0.5, 1.5, 0.1));
        assert_eq!(point.orbit, Some(2.0));
        assert_eq!(point.light.cone, SpotCone::UNATTENUATED);

        let spot = scene.punctual_lights[1];
        assert_eq!(spot.light.position.w, 0.0);
        assert_eq!(spot.light.direction, Vec3::NEG_Z);
        assert_eq!(spot.light.cone, SpotCone::from_angles(25.0, 30.0));
        assert_eq!(spot.orbit, None);

        assert_eq!(scene.objects.len(), 2);
        assert_eq!(scene.objects[0].mesh, MeshSource::Plane);
        assert_eq!(scene.objects[0].scale, Vec3::new(10.0, 1.0, 10.0));
        assert_eq!(
            scene.objects[1].mesh,
            MeshSource::Obj(PathBuf::from("meshes/backpack.obj"))
        );
    }

    #[test]
    fn unknown_light_type_is_an_error() {
        let bad = "<scene><light><type>area</type></light></scene>";
        let err = SceneDescription::from_xml(bad).unwrap_err();
        assert!(err.to_string().contains("unknown type `area`"));
    }

    #[test]
    fn missing_object_name_is_an_error() {
        let bad = "<scene><object><mesh>cube</mesh></object></scene>";
        assert!(SceneDescription::from_xml(bad).is_err());
    }

    #[test]
    fn exposure_defaults_and_must_be_positive() {
        let scene = SceneDescription::from_xml("<scene/>").unwrap();
        assert_eq!(scene.exposure, DEFAULT_EXPOSURE);

        let err = SceneDescription::from_xml("<scene><exposure>0</exposure></scene>").unwrap_err();
        assert!(err.to_string().contains("exposure must be a positive number"));
        assert!(SceneDescription::from_xml("<scene><exposure>-1</exposure></scene>").is_err());
    }

    #[test]
    fn wrong_root_is_an_error() {
        assert!(SceneDescription::from_xml("<world/>").is_err());
    }

    #[test]
    fn load_resolves_obj_paths_next_to_scene() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.xml");
        std::fs::write(
            &path,
            "<scene><object><name>M</name><mesh>model.obj</mesh></object></scene>",
        )
        .unwrap();
        let scene = SceneDescription::load(&path).unwrap();
        assert_eq!(
            scene.objects[0].mesh,
            MeshSource::Obj(dir.path().join("model.obj"))
        );
    }
}
