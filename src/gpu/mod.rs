//! wgpu compute backend. One invocation per pixel, one submission per pass.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::camera::Camera;
use crate::config::{Filter, RenderMode, RenderOptions};
use crate::error::{RenderError, Result};
use crate::primitive::{Primitive, Shape};
use crate::renderer::{check_dimensions, check_output, Renderer, Rgba};
use crate::sampling::pass_seed;
use crate::scene::SceneSnapshot;

const WORKGROUP_SIZE: u32 = 8;

const KIND_SPHERE: u32 = 0;
const KIND_PLANE: u32 = 1;
const KIND_TRIANGLE: u32 = 2;

const MODE_NORMALS: u32 = 0;
const MODE_PATH_TRACE: u32 = 1;

const FILTER_BOX: u32 = 0;
const FILTER_GAUSSIAN: u32 = 1;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct ParamsGpu {
    origin: [f32; 4],
    pixel00: [f32; 4],
    pixel_delta_u: [f32; 4],
    pixel_delta_v: [f32; 4],
    sky: [f32; 4],
    /// width, height, max_depth, mode
    dims: [u32; 4],
    /// primitive count, light count, pass seed, filter kind
    counts: [u32; 4],
    /// radiance clamp, filter width, filter falloff, unused
    limits: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct PrimitiveGpu {
    kind: u32,
    light: u32,
    _pad: [u32; 2],
    p0: [f32; 4],
    p1: [f32; 4],
    p2: [f32; 4],
    motion: [f32; 4],
    color: [f32; 4],
    emission: [f32; 4],
}

impl From<&Primitive> for PrimitiveGpu {
    fn from(primitive: &Primitive) -> Self {
        let (kind, p0, p1, p2) = match primitive.shape {
            Shape::Sphere { center, radius } => (KIND_SPHERE, center.extend(radius), [0.0; 4], [0.0; 4]),
            Shape::Plane { normal, offset } => (KIND_PLANE, normal.extend(offset), [0.0; 4], [0.0; 4]),
            Shape::Triangle { v0, v1, v2 } => (KIND_TRIANGLE, v0.extend(0.0), v1.extend(0.0), v2.extend(0.0)),
        };
        Self {
            kind,
            light: primitive.light as u32,
            _pad: [0; 2],
            p0,
            p1,
            p2,
            motion: primitive.motion.extend(0.0),
            color: primitive.material.color.extend(0.0),
            emission: primitive.emission.extend(0.0),
        }
    }
}

/// Device-side mirror of a snapshot.
struct SceneBuffers {
    primitives: wgpu::Buffer,
    lights: wgpu::Buffer,
    primitive_count: u32,
    light_count: u32,
}

impl Drop for SceneBuffers {
    fn drop(&mut self) {
        self.primitives.destroy();
        self.lights.destroy();
    }
}

struct FrameResources {
    width: u32,
    height: u32,
    accum: wgpu::Buffer,
    readback: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl Drop for FrameResources {
    fn drop(&mut self) {
        self.accum.destroy();
        self.readback.destroy();
    }
}

pub struct GpuRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    params: wgpu::Buffer,
    snapshot: SceneSnapshot,
    scene: Option<SceneBuffers>,
    frame: Option<FrameResources>,
    /// Passes run since the last `init`.
    passes: u32,
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Fails when an image needs more 8x8 workgroups along an axis than the
/// device can dispatch.
fn check_workgroups(width: u32, height: u32, max_per_dimension: u32) -> Result<()> {
    if width.div_ceil(WORKGROUP_SIZE) > max_per_dimension || height.div_ceil(WORKGROUP_SIZE) > max_per_dimension {
        return Err(RenderError::InvalidDimensions { width, height });
    }
    Ok(())
}

impl GpuRenderer {
    pub fn new(snapshot: SceneSnapshot) -> Result<Self> {
        let (device, queue) = pollster::block_on(Self::request_device())?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("pathtracer"),
            source: wgpu::ShaderSource::Wgsl(include_str!("renderer.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bind-group-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                storage_entry(1, true),
                storage_entry(2, true),
                storage_entry(3, false),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("compute-pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: "main",
        });

        let params = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("params-buffer"),
            size: std::mem::size_of::<ParamsGpu>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut renderer = Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
            params,
            snapshot,
            scene: None,
            frame: None,
            passes: 0,
        };
        renderer.upload_scene()?;
        Ok(renderer)
    }

    async fn request_device() -> Result<(wgpu::Device, wgpu::Queue)> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;

        let adapter_limits = adapter.limits();
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("tinsel-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits {
                        max_storage_buffer_binding_size: adapter_limits.max_storage_buffer_binding_size,
                        max_buffer_size: adapter_limits.max_buffer_size,
                        ..wgpu::Limits::downlevel_defaults()
                    },
                },
                None,
            )
            .await
            .map_err(|e| RenderError::RequestDevice(format!("{e:?}")))?;
        tracing::info!(adapter = %adapter.get_info().name, "gpu device ready");
        Ok((device, queue))
    }

    fn check_size(&self, what: &'static str, requested: u64) -> Result<()> {
        let limits = self.device.limits();
        let limit = (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size);
        if requested > limit {
            return Err(RenderError::BufferTooLarge { what, requested, limit });
        }
        Ok(())
    }

    fn check_workgroups(&self, width: u32, height: u32) -> Result<()> {
        check_workgroups(width, height, self.device.limits().max_compute_workgroups_per_dimension)
    }

    /// Runs `create` inside an out-of-memory error scope.
    fn allocate<T>(&self, what: &'static str, create: impl FnOnce(&wgpu::Device) -> T) -> Result<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let resource = create(&self.device);
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(_) => Err(RenderError::OutOfMemory { what }),
            None => Ok(resource),
        }
    }

    fn storage_init(&self, what: &'static str, items: &[PrimitiveGpu]) -> Result<wgpu::Buffer> {
        // Zero-length bindings are invalid, so empty lists get one zeroed element.
        let dummy = [PrimitiveGpu::zeroed()];
        let items = if items.is_empty() { &dummy[..] } else { items };
        self.check_size(what, std::mem::size_of_val(items) as u64)?;
        self.allocate(what, |device| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(what),
                contents: bytemuck::cast_slice(items),
                usage: wgpu::BufferUsages::STORAGE,
            })
        })
    }

    fn upload_scene(&mut self) -> Result<()> {
        let primitives: Vec<PrimitiveGpu> = self.snapshot.primitives().iter().map(PrimitiveGpu::from).collect();
        let lights: Vec<PrimitiveGpu> = self.snapshot.lights().iter().map(PrimitiveGpu::from).collect();
        let scene = SceneBuffers {
            primitives: self.storage_init("primitives-buffer", &primitives)?,
            lights: self.storage_init("lights-buffer", &lights)?,
            primitive_count: primitives.len() as u32,
            light_count: lights.len() as u32,
        };
        tracing::debug!(primitives = scene.primitive_count, lights = scene.light_count, "uploaded scene");
        self.scene = Some(scene);
        Ok(())
    }

    fn params_for(&self, camera: &Camera, options: &RenderOptions, frame: &FrameResources, seed: u32) -> ParamsGpu {
        let cf = camera.frame(frame.width, frame.height);
        let (primitive_count, light_count) =
            self.scene.as_ref().map_or((0, 0), |s| (s.primitive_count, s.light_count));
        let mode = match options.mode {
            RenderMode::Normals => MODE_NORMALS,
            RenderMode::PathTrace | RenderMode::Complexity => MODE_PATH_TRACE,
        };
        let (filter, filter_width, falloff) = match options.filter {
            Filter::Box => (FILTER_BOX, 0.0, 0.0),
            Filter::Gaussian { width, falloff } => (FILTER_GAUSSIAN, width, falloff),
        };
        ParamsGpu {
            origin: cf.origin.extend(0.0),
            pixel00: cf.pixel00.extend(0.0),
            pixel_delta_u: cf.pixel_delta_u.extend(0.0),
            pixel_delta_v: cf.pixel_delta_v.extend(0.0),
            sky: self.snapshot.sky().extend(0.0),
            dims: [frame.width, frame.height, options.max_depth, mode],
            counts: [primitive_count, light_count, seed, filter],
            limits: [options.clamp, filter_width, falloff, 0.0],
        }
    }

    fn dispatch(&self, frame: &FrameResources, params: &ParamsGpu) {
        self.queue.write_buffer(&self.params, 0, bytemuck::bytes_of(params));
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("encoder") });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("compute-pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &frame.bind_group, &[]);
            pass.dispatch_workgroups(
                frame.width.div_ceil(WORKGROUP_SIZE),
                frame.height.div_ceil(WORKGROUP_SIZE),
                1,
            );
        }
        self.queue.submit(Some(encoder.finish()));
    }

    fn read_back(&self, frame: &FrameResources, output: &mut [Rgba]) -> Result<()> {
        let size = frame.accum.size();
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("copy-encoder") });
        encoder.copy_buffer_to_buffer(&frame.accum, 0, &frame.readback, 0, size);
        self.queue.submit(Some(encoder.finish()));

        let slice = frame.readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| RenderError::Readback(format!("map_async recv failed: {e:?}")))?
            .map_err(|e| RenderError::Readback(format!("map_async failed: {e:?}")))?;

        {
            let data = slice.get_mapped_range();
            bytemuck::cast_slice_mut::<Rgba, u8>(output).copy_from_slice(&data);
        }
        frame.readback.unmap();
        Ok(())
    }
}

impl Renderer for GpuRenderer {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn init(&mut self, width: u32, height: u32) -> Result<()> {
        let pixels = check_dimensions(width, height)?;
        self.frame = None;
        if self.scene.is_none() {
            self.upload_scene()?;
        }

        let size = pixels as u64 * std::mem::size_of::<Rgba>() as u64;
        self.check_size("accumulator", size)?;
        self.check_workgroups(width, height)?;

        // wgpu zero-fills new buffers.
        let accum = self.allocate("accumulator", |device| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("accum-buffer"),
                size,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            })
        })?;
        let readback = self.allocate("readback", |device| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("readback-buffer"),
                size,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        })?;

        let Some(scene) = self.scene.as_ref() else {
            return Err(RenderError::NotInitialized);
        };
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bind-group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: self.params.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: scene.primitives.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 2, resource: scene.lights.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 3, resource: accum.as_entire_binding() },
            ],
        });

        self.frame = Some(FrameResources { width, height, accum, readback, bind_group });
        self.passes = 0;
        tracing::info!(width, height, "gpu accumulator reset");
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(mode = ?options.mode, spp = options.samples_per_pixel))]
    fn render(&mut self, camera: &Camera, options: &RenderOptions, output: &mut [Rgba]) -> Result<()> {
        let frame = self.frame.take().ok_or(RenderError::NotInitialized)?;
        let result = self.render_frame(&frame, camera, options, output);
        self.frame = Some(frame);
        result
    }

    fn teardown(&mut self) {
        self.frame = None;
        self.scene = None;
        self.passes = 0;
    }
}

impl GpuRenderer {
    fn render_frame(
        &mut self,
        frame: &FrameResources,
        camera: &Camera,
        options: &RenderOptions,
        output: &mut [Rgba],
    ) -> Result<()> {
        check_output(frame.width as usize * frame.height as usize, output)?;

        match options.mode {
            RenderMode::Complexity => {
                return Err(RenderError::UnsupportedMode { backend: "gpu", mode: options.mode });
            }
            RenderMode::Normals => {
                let params = self.params_for(camera, options, frame, 0);
                self.dispatch(frame, &params);
            }
            RenderMode::PathTrace => {
                for _ in 0..options.samples_per_pixel {
                    let params = self.params_for(camera, options, frame, pass_seed(options.seed, self.passes));
                    self.dispatch(frame, &params);
                    tracing::debug!(pass = self.passes, "gpu pass submitted");
                    self.passes = self.passes.wrapping_add(1);
                }
            }
        }

        self.read_back(frame, output)
    }
}

impl Drop for GpuRenderer {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CpuRenderer;
    use crate::scene::Scene;
    use crate::scenes::build_preset;

    fn gpu_or_skip(snapshot: SceneSnapshot) -> Option<GpuRenderer> {
        match GpuRenderer::new(snapshot) {
            Ok(renderer) => Some(renderer),
            Err(RenderError::NoAdapter | RenderError::RequestDevice(_)) => {
                eprintln!("no usable GPU adapter, skipping");
                None
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn gpu_layouts_match_shader() {
        assert_eq!(std::mem::size_of::<PrimitiveGpu>(), 112);
        assert_eq!(std::mem::size_of::<ParamsGpu>(), 128);
    }

    #[test]
    fn workgroup_count_is_bounded() {
        assert!(check_workgroups(8 * 65_535, 64, 65_535).is_ok());
        assert!(matches!(
            check_workgroups(8 * 65_535 + 1, 64, 65_535),
            Err(RenderError::InvalidDimensions { width: 524_281, height: 64 })
        ));
        assert!(check_workgroups(64, 8 * 65_535 + 1, 65_535).is_err());
    }

    #[test]
    fn primitive_packing() {
        let preset = build_preset("cornell").unwrap();
        let snapshot = preset.scene.snapshot();
        let light = PrimitiveGpu::from(&snapshot.lights()[0]);
        assert_eq!(light.kind, KIND_TRIANGLE);
        assert_eq!(light.light, 1);
        assert_eq!(light.emission[..3], [15.0; 3]);

        let sphere = PrimitiveGpu::from(snapshot.primitives().last().unwrap());
        assert_eq!(sphere.kind, KIND_SPHERE);
        assert_eq!(sphere.p0, [190.0, 90.0, 190.0, 90.0]);
    }

    #[test]
    fn normals_miss_gray_on_gpu() {
        let Some(mut renderer) = gpu_or_skip(Scene::new().snapshot()) else {
            return;
        };
        renderer.init(9, 3).unwrap();
        let mut output = vec![[0.0; 4]; 27];
        let options = RenderOptions { mode: RenderMode::Normals, ..Default::default() };
        renderer.render(&Camera::default(), &options, &mut output).unwrap();
        renderer.render(&Camera::default(), &options, &mut output).unwrap();
        assert!(output.iter().all(|p| *p == [0.5, 0.5, 0.5, 1.0]));
    }

    #[test]
    fn gpu_matches_cpu_statistically() {
        let preset = build_preset("lit_sphere").unwrap();
        let Some(mut gpu) = gpu_or_skip(preset.scene.snapshot()) else {
            return;
        };
        let mut cpu = CpuRenderer::new(preset.scene.snapshot(), true);
        let options = RenderOptions { samples_per_pixel: 1000, ..Default::default() };

        let mut results = Vec::new();
        for renderer in [&mut gpu as &mut dyn Renderer, &mut cpu] {
            renderer.init(3, 3).unwrap();
            let mut output = vec![[0.0; 4]; 9];
            renderer.render(&preset.camera, &options, &mut output).unwrap();
            results.push(output[4]);
        }
        assert_eq!(results[0][3], 1000.0);
        let gpu_mean = results[0][0] / results[0][3];
        let cpu_mean = results[1][0] / results[1][3];
        assert!((gpu_mean - cpu_mean).abs() < 0.03, "gpu {gpu_mean} cpu {cpu_mean}");
    }

    #[test]
    fn complexity_is_rejected_and_frame_survives() {
        let Some(mut renderer) = gpu_or_skip(Scene::new().snapshot()) else {
            return;
        };
        renderer.init(2, 2).unwrap();
        let mut output = vec![[0.0; 4]; 4];
        let complexity = RenderOptions { mode: RenderMode::Complexity, ..Default::default() };
        assert!(matches!(
            renderer.render(&Camera::default(), &complexity, &mut output),
            Err(RenderError::UnsupportedMode { backend: "gpu", mode: RenderMode::Complexity })
        ));
        let boxed = RenderOptions { filter: Filter::Box, ..Default::default() };
        renderer.render(&Camera::default(), &boxed, &mut output).unwrap();
        assert_eq!(output[0][3], 1.0);
    }

    #[test]
    fn teardown_then_render_fails() {
        let Some(mut renderer) = gpu_or_skip(Scene::new().snapshot()) else {
            return;
        };
        renderer.init(2, 2).unwrap();
        renderer.teardown();
        let mut output = vec![[0.0; 4]; 4];
        assert!(matches!(
            renderer.render(&Camera::default(), &RenderOptions::default(), &mut output),
            Err(RenderError::NotInitialized)
        ));
        renderer.init(2, 2).unwrap();
        renderer.render(&Camera::default(), &RenderOptions::default(), &mut output).unwrap();
        assert_eq!(output[0][3], 1.0);
    }
}
