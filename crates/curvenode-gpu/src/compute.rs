//! wgpu compute evaluator for packed curve mappings.
//!
//! Runs the `curves_*` snippet library over a storage buffer of inputs and
//! reads the results back. Vector mappings read and write `xyz` and pass
//! `w` through.

use std::num::NonZeroU64;
use std::sync::mpsc;

use curvenode_core::CurveMapping;
use parking_lot::Mutex;
use wgpu::util::DeviceExt;

use crate::codegen::CURVES_WGSL;
use crate::color_band::{ColorBandAtlas, ColorBandTexture};
use crate::error::GpuError;
use crate::params::{CurvesUniformsGpu, PackedCurves, pack};

const WORKGROUP_SIZE: u32 = 64;

const ENTRY_WGSL: &str = r#"
struct CurvesUniforms {
    range_scale: vec4<f32>,
    ext: array<vec4<f32>, 4>,
    layer: f32,
    variant: u32,
    channel_count: u32,
    _pad: u32,
}

@group(0) @binding(0) var curve_band: texture_2d<f32>;
@group(0) @binding(1) var<uniform> params: CurvesUniforms;
@group(0) @binding(2) var<storage, read> facs: array<f32>;
@group(0) @binding(3) var<storage, read> inputs: array<vec4<f32>>;
@group(0) @binding(4) var<storage, read_write> outputs: array<vec4<f32>>;

@compute @workgroup_size(64)
fn evaluate_curves(@builtin(global_invocation_id) gid: vec3<u32>) {
    let idx = gid.x;
    if (idx >= arrayLength(&inputs)) {
        return;
    }
    let fac = facs[idx];
    let value = inputs[idx];
    switch params.variant {
        case 0u: {
            let v = curves_vec(curve_band, fac, value.xyz, params.layer, params.range_scale.xyz,
                params.ext[0], params.ext[1], params.ext[2]);
            outputs[idx] = vec4<f32>(v, value.w);
        }
        case 1u: {
            outputs[idx] = curves_rgb(curve_band, fac, value, params.layer, params.range_scale,
                params.ext[0], params.ext[1], params.ext[2], params.ext[3]);
        }
        default: {
            outputs[idx] = curves_rgb_opti(curve_band, fac, value, params.layer,
                params.range_scale, params.ext[3]);
        }
    }
}
"#;

/// Request a device on the default adapter, without a surface.
pub fn request_headless_device() -> Result<(wgpu::Device, wgpu::Queue), GpuError> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        ..Default::default()
    }))?;
    tracing::debug!(adapter = ?adapter.get_info().name, "using GPU adapter");

    let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: Some("curvenode_device"),
        required_limits: adapter.limits(),
        ..Default::default()
    }))?;
    Ok((device, queue))
}

/// Compute pipeline evaluating one packed mapping per dispatch.
pub struct CurvesCompute {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    params_buffer: wgpu::Buffer,
    staging: Mutex<Option<wgpu::Buffer>>,
}

impl CurvesCompute {
    /// Compile the snippet library and the evaluation entry point.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let source = format!("{CURVES_WGSL}\n{ENTRY_WGSL}");
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("curvenode_curves_shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("curvenode_curves_layout"),
            entries: &[
                // binding 0: color band atlas
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                // binding 1: uniforms
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(
                            std::mem::size_of::<CurvesUniformsGpu>() as u64,
                        ),
                    },
                    count: None,
                },
                storage_layout_entry(2, true),
                storage_layout_entry(3, true),
                storage_layout_entry(4, false),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("curvenode_curves_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("curvenode_curves_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("evaluate_curves"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("curvenode_curves_uniform"),
            size: std::mem::size_of::<CurvesUniformsGpu>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
            params_buffer,
            staging: Mutex::new(None),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Pack `mapping` into a fresh atlas, upload it and evaluate.
    pub fn evaluate_mapping(
        &self,
        mapping: &CurveMapping,
        facs: &[f32],
        inputs: &[[f32; 4]],
    ) -> Result<Vec<[f32; 4]>, GpuError> {
        let mut atlas = ColorBandAtlas::new();
        let packed = pack(mapping, &mut atlas);
        let band = atlas.upload(&self.device, &self.queue);
        self.evaluate(&packed, &band, facs, inputs)
    }

    /// Evaluate `packed` against `band` for every input. Blocks until the
    /// results are read back.
    pub fn evaluate(
        &self,
        packed: &PackedCurves,
        band: &ColorBandTexture,
        facs: &[f32],
        inputs: &[[f32; 4]],
    ) -> Result<Vec<[f32; 4]>, GpuError> {
        if facs.len() != inputs.len() {
            return Err(GpuError::InvalidArgument(format!(
                "{} factors for {} inputs",
                facs.len(),
                inputs.len()
            )));
        }
        if packed.layer as u32 >= band.rows {
            return Err(GpuError::InvalidArgument(format!(
                "layer {} outside a {}-row color band",
                packed.layer, band.rows
            )));
        }
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let count = inputs.len() as u32;
        let out_size = inputs.len() as u64 * 16;

        // Held from the uniform write through readback: the uniform and
        // staging buffers are shared between callers.
        let mut staging_cache = self.staging.lock();

        self.queue.write_buffer(
            &self.params_buffer,
            0,
            bytemuck::bytes_of(&packed.to_uniforms()),
        );
        let fac_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("curvenode_curves_facs"),
                contents: bytemuck::cast_slice(facs),
                usage: wgpu::BufferUsages::STORAGE,
            });
        let input_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("curvenode_curves_inputs"),
                contents: bytemuck::cast_slice(inputs),
                usage: wgpu::BufferUsages::STORAGE,
            });
        let output_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("curvenode_curves_outputs"),
            size: out_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("curvenode_curves_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&band.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: fac_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: input_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: output_buffer.as_entire_binding(),
                },
            ],
        });

        let staging = match staging_cache.take() {
            Some(buf) if buf.size() >= out_size => buf,
            _ => self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("curvenode_curves_staging"),
                size: out_size,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            }),
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("curvenode_curves_encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("curvenode_curves_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(count.div_ceil(WORKGROUP_SIZE), 1, 1);
        }
        encoder.copy_buffer_to_buffer(&output_buffer, 0, &staging, 0, out_size);
        self.queue.submit(std::iter::once(encoder.finish()));

        match self.read_back(&staging, out_size) {
            Ok(results) => {
                *staging_cache = Some(staging);
                tracing::trace!(count, variant = %packed.variant, "GPU curve evaluation");
                Ok(results)
            }
            Err(err) => {
                // A failed map may leave the buffer pending; don't reuse it.
                tracing::warn!(error = %err, "curve readback failed, dropping staging buffer");
                Err(err)
            }
        }
    }

    /// Map `staging`, copy out `size` bytes and unmap.
    fn read_back(&self, staging: &wgpu::Buffer, size: u64) -> Result<Vec<[f32; 4]>, GpuError> {
        let slice = staging.slice(..size);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::PollType::wait_indefinitely())?;
        rx.recv().map_err(|_| GpuError::ReadbackDropped)??;

        let data = slice.get_mapped_range();
        let results: Vec<[f32; 4]> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        staging.unmap();
        Ok(results)
    }
}

fn storage_layout_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
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
