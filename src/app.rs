//! Application event loop.
//!
//! The loop follows this pattern:
//! 1. On resume: create the window and GPU context, import the scene, compile
//!    the shader, realize GPU resources and place the camera
//! 2. Collect window events into the input state
//! 3. On redraw: update the camera with the elapsed milliseconds, walk the
//!    scene into a frame recorder, submit and present
//!
//! Setup failures stop the event loop and are returned from [`run`].

use std::{path::Path, sync::Arc};

use anyhow::Context as _;
use cgmath::Vector3;
use instant::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    camera::FirstPersonCamera,
    context::Context,
    data_structures::{model::TextureSource, scene_graph::SourceScene, texture::Texture},
    gpu::{
        GpuBackend,
        device::{FrameRecorder, ObjectBuffer, WgpuBackend},
    },
    input::InputState,
    options::{AssetOptions, CameraOptions, ViewerOptions},
    pipelines::ScenePipeline,
    render::render_scene,
    resources::{self, cache::ResourceCache, texture::TextureCache},
};

/// Everything that exists once the window is up.
pub struct Viewer {
    ctx: Context,
    pipeline: ScenePipeline,
    objects: ObjectBuffer,
    scene: SourceScene,
    resources: ResourceCache<WgpuBackend>,
    textures: TextureCache<WgpuBackend>,
    camera: FirstPersonCamera,
    input: InputState,
    last_time: Instant,
}

impl Viewer {
    async fn new(window: Arc<Window>, options: &ViewerOptions) -> anyhow::Result<Self> {
        let ctx = Context::new(window, options.window.clear_colour).await?;

        let model_path = options.assets.model_path();
        let import = async {
            resources::import_scene(&model_path)
                .await
                .with_context(|| format!("Failed to import scene {}", model_path.display()))
        };
        let pipeline = ScenePipeline::new(
            &ctx.device,
            ctx.config.format,
            options.assets.shader.as_deref(),
        );
        let (scene, pipeline) = futures::future::try_join(import, pipeline).await?;

        let mut backend = WgpuBackend::new(&ctx, &pipeline);
        let default_texture = load_default_texture(&mut backend, &options.assets);
        let mut textures = TextureCache::new(&scene.base_path, default_texture);
        let mut resources = ResourceCache::new();
        resources.realize(&scene, &mut backend, &mut textures)?;

        let input = InputState::new();
        let mut camera = FirstPersonCamera::new();
        configure_camera(&mut camera, &options.camera, ctx.aspect_ratio());
        camera.initialize(&input);
        let [x, y, z] = options.camera.start_position;
        camera.camera_mut().set_position(Vector3::new(x, y, z));

        let objects = ObjectBuffer::new(&ctx.device, &pipeline.object_layout);

        Ok(Self {
            ctx,
            pipeline,
            objects,
            scene,
            resources,
            textures,
            camera,
            input,
            last_time: Instant::now(),
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(width, height) {
            let aspect_ratio = self.ctx.aspect_ratio();
            self.camera.camera_mut().set_aspect_ratio(aspect_ratio);
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        // invoke main render loop
        self.ctx.window.request_redraw();

        let now = Instant::now();
        let elapsed = now.duration_since(self.last_time).as_secs_f32() * 1000.0;
        self.last_time = now;
        self.camera.update(&self.input, elapsed);

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut recorder = FrameRecorder::new();
        render_scene(
            &self.scene,
            &self.resources,
            self.camera.camera_mut(),
            &mut recorder,
        );
        recorder.submit(&self.ctx, &self.pipeline, &mut self.objects, &view);

        output.present();
        Ok(())
    }

    fn unload(&mut self) {
        log::info!(
            "Releasing {} meshes, {} materials and {} textures",
            self.resources.mesh_count(),
            self.resources.material_count(),
            self.textures.len()
        );
        self.resources.clear();
        self.textures.unload_all();
    }
}

fn configure_camera(camera: &mut FirstPersonCamera, options: &CameraOptions, aspect_ratio: f32) {
    camera.set_mouse_sensitivity(options.mouse_sensitivity);
    camera.set_rotation_rate(options.rotation_rate.to_radians());
    camera.set_movement_rate(options.movement_rate);
    let camera = camera.camera_mut();
    camera.set_field_of_view(options.fov.to_radians());
    camera.set_aspect_ratio(aspect_ratio);
    camera.set_near_plane_distance(options.near);
    camera.set_far_plane_distance(options.far);
}

/// The configured default texture, or plain white if it cannot be loaded.
fn load_default_texture(backend: &mut WgpuBackend, assets: &AssetOptions) -> Texture {
    let source = TextureSource::Path(assets.default_texture.clone());
    let loaded = resources::texture::decode(&assets.directory, &source)
        .and_then(|image| backend.upload_texture(&source.key(), &image, true));
    match loaded {
        Ok(texture) => texture,
        Err(e) => {
            log::error!("Default texture unavailable, using plain white: {:#}", e);
            backend.solid_texture([255, 255, 255, 255], "default_texture")
        }
    }
}

pub struct App {
    async_runtime: tokio::runtime::Runtime,
    options: ViewerOptions,
    viewer: Option<Viewer>,
    error: Option<anyhow::Error>,
}

impl App {
    pub fn new(options: ViewerOptions) -> anyhow::Result<Self> {
        Ok(Self {
            async_runtime: tokio::runtime::Runtime::new()?,
            options,
            viewer: None,
            error: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewer.is_some() || self.error.is_some() {
            return;
        }
        let window_attributes = Window::default_attributes()
            .with_title(self.options.window.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.options.window.width,
                self.options.window.height,
            ));
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        let viewer = self
            .async_runtime
            .block_on(Viewer::new(window, &self.options));
        match viewer {
            Ok(viewer) => {
                viewer.ctx.window.request_redraw();
                self.viewer = Some(viewer);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let viewer = match &mut self.viewer {
            Some(viewer) => viewer,
            None => return,
        };

        viewer.input.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => viewer.resize(size.width, size.height),
            WindowEvent::RedrawRequested => match viewer.render() {
                Ok(_) => {}
                // Reconfigure the surface if it's lost or outdated
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    let size = viewer.ctx.window.inner_size();
                    viewer.resize(size.width, size.height);
                }
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    self.fail(event_loop, anyhow::anyhow!("The GPU ran out of memory"));
                }
                Err(e) => {
                    log::error!("Unable to render {}", e);
                }
            },
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(viewer) = &mut self.viewer {
            viewer.unload();
        }
    }
}

/// Opens the viewer window and blocks until it is closed.
pub fn run(options: ViewerOptions) -> anyhow::Result<()> {
    let event_loop = EventLoop::new()?;
    let mut app = App::new(options)?;
    event_loop.run_app(&mut app)?;
    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Runs with the options in `path`, or the defaults if there is no such file.
pub fn run_with_options_file(path: &Path) -> anyhow::Result<()> {
    let options = ViewerOptions::load_or_default(path)?;
    run(options)
}
