use std::any::Any;
use std::env;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use bytemuck::pod_read_unaligned;
use glam::Vec2;
use log::{debug, warn};
use pollster::block_on;
use winit::dpi::PhysicalSize;
use winit::event::{
    DeviceEvent, ElementState, Event, KeyboardInput, MouseScrollDelta, WindowEvent,
};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::run_return::EventLoopExtRunReturn;
use winit::window::{CursorGrabMode, WindowBuilder};

use lantern_viewer::light_buffer::LightHeader;
use lantern_viewer::{
    FrameDriver, HeadlessDevice, HeadlessProgram, KeyCode, MeshSource, NamedKey, Renderer,
    SceneDescription, LIGHT_BLOCK_NAME,
};

const WINDOW_WIDTH: u32 = 1920;
const WINDOW_HEIGHT: u32 = 1080;
const FIXED_TIME_STEP: f32 = 1.0 / 60.0;
/// Pixel scroll deltas (touchpads) are converted to lines with this factor.
const PIXELS_PER_LINE: f32 = 20.0;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse(env::args().skip(1))?;
    let scene = match &options.scene {
        Some(path) => SceneDescription::load(path)
            .with_context(|| format!("failed to load scene {}", path.display()))?,
        None => SceneDescription::builtin(),
    };

    println!(
        "Loaded scene with {} objects ({} directional, {} punctual lights)",
        scene.objects.len(),
        scene.directional_lights.len(),
        scene.punctual_lights.len()
    );
    for object in &scene.objects {
        let mesh = match &object.mesh {
            MeshSource::Cube => "cube".to_string(),
            MeshSource::Plane => "plane".to_string(),
            MeshSource::Obj(path) => path.display().to_string(),
        };
        println!(" - {} ({mesh})", object.name);
    }

    if options.summary_only {
        run_headless(&scene, options.frames)
    } else {
        match run_interactive(&scene) {
            Ok(()) => Ok(()),
            Err(err) => {
                if err.downcast_ref::<WindowInitError>().is_some() {
                    eprintln!(
                        "{err}. Falling back to --summary-only mode (set DISPLAY or install X11 libs to enable rendering)."
                    );
                    run_headless(&scene, options.frames)
                } else {
                    Err(err)
                }
            }
        }
    }
}

fn run_headless(scene: &SceneDescription, frames: u32) -> Result<()> {
    let mut device = HeadlessDevice::new();
    let mut program = HeadlessProgram::new("forward")
        .with_block(LIGHT_BLOCK_NAME)
        .with_uniform("view")
        .with_uniform("projection")
        .with_uniform("camera_position")
        .with_uniform("exposure");

    let mut driver = FrameDriver::new(scene, &mut device, WINDOW_WIDTH, WINDOW_HEIGHT)?;
    driver
        .bind_program(&mut device, &mut program)
        .context("failed to bind light block")?;

    for _ in 0..frames {
        let uniforms = driver.update(FIXED_TIME_STEP, &mut device)?;
        uniforms.apply_to(&mut program);
    }
    println!("Simulated {frames} frame(s)");
    print_final_state(&driver, &device)
}

fn print_final_state(driver: &FrameDriver, device: &HeadlessDevice) -> Result<()> {
    let camera = driver.camera();
    let position = camera.position();
    println!(
        "Camera pos=({:.2}, {:.2}, {:.2}) yaw={:.2} pitch={:.2} fov={:.2}",
        position.x,
        position.y,
        position.z,
        camera.yaw(),
        camera.pitch(),
        camera.vertical_fov()
    );
    println!("Exposure: {:.2}", driver.exposure());

    let block = device
        .contents(driver.packer().buffer())
        .context("light block was never allocated")?;
    let header: LightHeader =
        pod_read_unaligned(&block[..std::mem::size_of::<LightHeader>()]);
    println!(
        "Light block: directional_count={} punctual_count={}",
        header.directional_count, header.punctual_count
    );

    for (slot, light) in driver.lights().directional_lights().iter().enumerate() {
        println!(
            " - directional[{slot}] dir=({:.2}, {:.2}, {:.2}) color=({:.2}, {:.2}, {:.2})",
            light.direction.x,
            light.direction.y,
            light.direction.z,
            light.color.x,
            light.color.y,
            light.color.z
        );
    }
    for (slot, light) in driver.lights().punctual_lights().iter().enumerate() {
        println!(
            " - punctual[{slot}] pos=({:.2}, {:.2}, {:.2}) color=({:.2}, {:.2}, {:.2}) spot=({:.2}, {:.2})",
            light.position.x,
            light.position.y,
            light.position.z,
            light.color.x,
            light.color.y,
            light.color.z,
            light.cone.scale,
            light.cone.offset
        );
    }
    Ok(())
}

fn run_interactive(scene: &SceneDescription) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop =
        event_loop.map_err(|panic| WindowInitError::from_panic("event loop", panic))?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Lantern Viewer")
            .with_inner_size(PhysicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT))
            .build(&event_loop)
            .map_err(|err| WindowInitError::from_error("window", err))?,
    );

    let mut renderer = block_on(Renderer::new(Arc::clone(&window), scene))?;
    let size = renderer.size();
    let driver = FrameDriver::new(scene, renderer.device_mut(), size.width, size.height)?;
    renderer
        .attach_lights(&driver)
        .context("failed to bind light block")?;

    let cursor_grabbed = grab_cursor(&window);
    let mut app = AppState {
        renderer,
        driver,
        cursor_grabbed,
        last_frame: Instant::now(),
        last_error: None,
    };

    let mut event_loop = event_loop;
    event_loop.run_return(|event, _, control_flow| {
        *control_flow = ControlFlow::Poll;
        if let Err(err) = app.process_event(&event, control_flow) {
            app.last_error = Some(err);
            control_flow.set_exit();
        }
    });

    match app.last_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Hides and captures the cursor so mouse look uses raw motion.
fn grab_cursor(window: &winit::window::Window) -> bool {
    let grabbed = window
        .set_cursor_grab(CursorGrabMode::Locked)
        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
    match grabbed {
        Ok(()) => {
            window.set_cursor_visible(false);
            true
        }
        Err(err) => {
            warn!("cursor grab unavailable, falling back to cursor positions: {err}");
            false
        }
    }
}

struct AppState {
    renderer: Renderer,
    driver: FrameDriver,
    cursor_grabbed: bool,
    last_frame: Instant,
    last_error: Option<anyhow::Error>,
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

impl AppState {
    fn process_event(&mut self, event: &Event<()>, control_flow: &mut ControlFlow) -> Result<()> {
        match event {
            Event::WindowEvent { event, window_id } if *window_id == self.renderer.window_id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        control_flow.set_exit();
                    }
                    WindowEvent::Resized(size) => self.resize(*size),
                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        self.resize(**new_inner_size);
                    }
                    WindowEvent::KeyboardInput { input, .. } => {
                        self.handle_keyboard(input);
                    }
                    WindowEvent::CursorMoved { position, .. } if !self.cursor_grabbed => {
                        let position = Vec2::new(position.x as f32, position.y as f32);
                        self.driver.input_mut().cursor_moved(position);
                    }
                    WindowEvent::MouseWheel { delta, .. } => {
                        let lines = match delta {
                            MouseScrollDelta::LineDelta(_, y) => *y,
                            MouseScrollDelta::PixelDelta(pixels) => {
                                pixels.y as f32 / PIXELS_PER_LINE
                            }
                        };
                        self.driver.input_mut().scrolled(lines);
                    }
                    _ => {}
                }
            }
            Event::DeviceEvent {
                event: DeviceEvent::MouseMotion { delta },
                ..
            } if self.cursor_grabbed => {
                let delta = Vec2::new(delta.0 as f32, delta.1 as f32);
                self.driver.input_mut().pointer_moved(delta);
            }
            Event::RedrawRequested(window_id) if *window_id == self.renderer.window_id() => {
                if self.driver.input().exit_requested() {
                    control_flow.set_exit();
                    return Ok(());
                }
                self.redraw()?;
            }
            Event::MainEventsCleared => {
                self.renderer.window().request_redraw();
            }
            _ => {}
        }
        Ok(())
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.renderer.resize(size);
        self.driver.resize(size.width, size.height);
    }

    fn redraw(&mut self) -> Result<()> {
        let now = Instant::now();
        let delta_time = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        let uniforms = self.driver.update(delta_time, self.renderer.device_mut())?;
        let punctual_count = self.driver.lights().punctual_lights().len();
        if let Err(err) = self.renderer.render(&uniforms, punctual_count) {
            match err {
                wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                    let size = self.renderer.window().inner_size();
                    self.renderer.resize(size);
                }
                wgpu::SurfaceError::OutOfMemory => {
                    return Err(anyhow!("GPU is out of memory"));
                }
                wgpu::SurfaceError::Timeout => {
                    warn!("Surface timeout; retrying next frame");
                }
            }
        }
        Ok(())
    }

    fn handle_keyboard(&mut self, input: &KeyboardInput) {
        let Some(keycode) = input.virtual_keycode.and_then(map_keycode) else {
            return;
        };
        let state = self.driver.input_mut();
        match input.state {
            ElementState::Pressed => state.set_key_down(keycode),
            ElementState::Released => state.set_key_up(keycode),
        }
    }
}

fn map_keycode(code: winit::event::VirtualKeyCode) -> Option<KeyCode> {
    use winit::event::VirtualKeyCode as Key;
    Some(match code {
        Key::Space => KeyCode::Named(NamedKey::Space),
        Key::Escape => KeyCode::Named(NamedKey::Escape),
        Key::W => KeyCode::Character('W'),
        Key::A => KeyCode::Character('A'),
        Key::S => KeyCode::Character('S'),
        Key::D => KeyCode::Character('D'),
        Key::C => KeyCode::Character('C'),
        _ => return None,
    })
}

#[derive(Debug, PartialEq)]
struct CliOptions {
    scene: Option<PathBuf>,
    summary_only: bool,
    frames: u32,
}

const USAGE: &str = "Usage: lantern-viewer [scene.xml] [--summary-only] [--frames N]";

impl CliOptions {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut scene = None;
        let mut summary_only = false;
        let mut frames = 1;
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--summary-only" => summary_only = true,
                "--frames" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--frames expects a value. {USAGE}"))?;
                    frames = value
                        .parse()
                        .with_context(|| format!("invalid frame count `{value}`"))?;
                }
                other if other.starts_with("--") => {
                    return Err(anyhow!("Unknown argument: {other}. {USAGE}"));
                }
                path if scene.is_none() => scene = Some(PathBuf::from(path)),
                extra => return Err(anyhow!("Unexpected argument: {extra}. {USAGE}")),
            }
        }
        debug!("frames={frames} summary_only={summary_only}");
        Ok(Self {
            scene,
            summary_only,
            frames,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliOptions> {
        CliOptions::parse(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn defaults_to_builtin_scene_and_one_frame() {
        assert_eq!(
            parse(&[]).unwrap(),
            CliOptions {
                scene: None,
                summary_only: false,
                frames: 1,
            }
        );
    }

    #[test]
    fn parses_scene_and_flags_in_any_order() {
        let options = parse(&["--frames", "30", "demo.xml", "--summary-only"]).unwrap();
        assert_eq!(options.scene, Some(PathBuf::from("demo.xml")));
        assert!(options.summary_only);
        assert_eq!(options.frames, 30);
    }

    #[test]
    fn rejects_unknown_and_malformed_arguments() {
        assert!(parse(&["--run-scripts"]).is_err());
        assert!(parse(&["--frames"]).is_err());
        assert!(parse(&["--frames", "many"]).is_err());
        assert!(parse(&["a.xml", "b.xml"]).is_err());
    }

    #[test]
    fn maps_movement_keys() {
        use winit::event::VirtualKeyCode as Key;
        assert_eq!(map_keycode(Key::W), Some(KeyCode::Character('W')));
        assert_eq!(map_keycode(Key::Escape), Some(KeyCode::Named(NamedKey::Escape)));
        assert_eq!(map_keycode(Key::Q), None);
    }
}
