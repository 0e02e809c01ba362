//! Shader compilation and the scene render pipeline.

pub mod basic;

use std::path::Path;

/// WGSL source compiled into the binary. Used when no shader is configured
/// or the configured one fails to compile.
pub const BUILTIN_SHADER: &str = include_str!("scene.wgsl");

/**
 * A compiled shader module and its compile log.
 *
 * Compilation happens inside a validation error scope so a broken shader is
 * reported as a readable log instead of aborting the device.
 */
#[derive(Debug)]
pub struct ShaderProgram {
    module: Option<wgpu::ShaderModule>,
    log: String,
}

impl ShaderProgram {
    pub async fn compile(device: &wgpu::Device, label: &str, source: &str) -> Self {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        match device.pop_error_scope().await {
            None => Self {
                module: Some(module),
                log: String::new(),
            },
            Some(error) => Self {
                module: None,
                log: format!("{label}: {error}"),
            },
        }
    }

    /// Reads and compiles a WGSL file. A missing file ends up in the log like
    /// a compile error.
    pub async fn from_file(device: &wgpu::Device, path: &Path) -> Self {
        let label = path.display().to_string();
        match tokio::fs::read_to_string(path).await {
            Ok(source) => Self::compile(device, &label, &source).await,
            Err(e) => Self {
                module: None,
                log: format!("{label}: {e}"),
            },
        }
    }

    pub fn is_valid(&self) -> bool {
        self.module.is_some()
    }

    pub fn log(&self) -> &str {
        &self.log
    }

    pub fn module(&self) -> Option<&wgpu::ShaderModule> {
        self.module.as_ref()
    }
}

/// The one pipeline every mesh is drawn with.
#[derive(Debug)]
pub struct ScenePipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub material_layout: wgpu::BindGroupLayout,
    pub object_layout: wgpu::BindGroupLayout,
}

impl ScenePipeline {
    /// Builds the pipeline from the shader at `shader_path`, or from the
    /// built-in shader when there is none or it does not compile.
    pub async fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        shader_path: Option<&Path>,
    ) -> anyhow::Result<Self> {
        let mut program = None;
        if let Some(path) = shader_path {
            let configured = ShaderProgram::from_file(device, path).await;
            if configured.is_valid() {
                log::info!("Using shader {}", path.display());
                program = Some(configured);
            } else {
                log::error!(
                    "Shader compilation failed, using the built-in shader:\n{}",
                    configured.log()
                );
            }
        }
        let program = match program {
            Some(program) => program,
            None => ShaderProgram::compile(device, "Scene Shader", BUILTIN_SHADER).await,
        };
        let shader = program
            .module()
            .ok_or_else(|| anyhow::anyhow!("built-in shader is invalid: {}", program.log()))?;

        let material_layout = basic::material_layout(device);
        let object_layout = basic::object_layout(device);
        let pipeline = basic::mk_scene_pipeline(
            device,
            color_format,
            &material_layout,
            &object_layout,
            shader,
        );
        Ok(Self {
            pipeline,
            material_layout,
            object_layout,
        })
    }
}
