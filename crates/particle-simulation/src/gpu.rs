//! Headless wgpu compute backend
//!
//! Owns its own device and queue. Each dispatch uploads the flattened step
//! into fresh buffers, runs `shaders/grid_gravity.wgsl` once and blocks until
//! the integrated particles are read back. Particles are read from one buffer
//! and written to another so no invocation sees a partially updated state.

use wgpu::util::DeviceExt;

use crate::backend::{BackendError, ComputeBackend};
use crate::staging::{GpuParticle, TransferBuffers};

const WORKGROUP_SIZE: u32 = 256;

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    adapter_name: String,
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

impl WgpuBackend {
    /// Open a headless device, blocking on adapter and device requests
    pub fn new() -> Result<Self, BackendError> {
        pollster::block_on(Self::new_async())
    }

    pub async fn new_async() -> Result<Self, BackendError> {
        log::info!("Initializing compute backend...");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;
        let adapter_name = adapter.get_info().name;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Gravity Compute Device"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| BackendError::Device(e.to_string()))?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Grid Gravity Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/grid_gravity.wgsl").into()),
        });

        // 0: params (uniform)
        // 1: particles in (storage, read)
        // 2: cells (storage, read)
        // 3: cell member indices (storage, read)
        // 4: particles out (storage, write)
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Grid Gravity Bind Group Layout"),
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
                storage_entry(3, true),
                storage_entry(4, false),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Grid Gravity Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Grid Gravity Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        log::info!("Compute backend ready on {}", adapter_name);

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
            adapter_name,
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    fn check_limits(&self, buffers: &TransferBuffers) -> Result<(), BackendError> {
        let limits = self.device.limits();
        let limit = (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size);
        let [particles, cells, indices] = buffers.byte_sizes();

        for (label, size) in [("particles", particles), ("cells", cells), ("indices", indices)] {
            if size > limit {
                return Err(BackendError::BufferTooLarge { label, size, limit });
            }
        }

        let workgroups = (buffers.particle_count() as u32).div_ceil(WORKGROUP_SIZE);
        if workgroups > limits.max_compute_workgroups_per_dimension {
            return Err(BackendError::Dispatch(format!(
                "{} workgroups exceed the per-dimension limit of {}",
                workgroups, limits.max_compute_workgroups_per_dimension
            )));
        }
        Ok(())
    }

    fn read_back(&self, staging: &wgpu::Buffer) -> Result<Vec<GpuParticle>, BackendError> {
        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .map_err(|e| BackendError::Readback(e.to_string()))?;

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(BackendError::Readback(e.to_string())),
            Err(_) => {
                return Err(BackendError::Readback(
                    "map channel disconnected, device may be lost".to_string(),
                ))
            }
        }

        let particles = {
            let data = slice.get_mapped_range();
            bytemuck::cast_slice::<u8, GpuParticle>(&data).to_vec()
        };
        staging.unmap();
        Ok(particles)
    }
}

impl ComputeBackend for WgpuBackend {
    fn name(&self) -> &str {
        &self.adapter_name
    }

    fn dispatch(&mut self, buffers: &TransferBuffers) -> Result<Vec<GpuParticle>, BackendError> {
        let count = buffers.particle_count();
        if count == 0 {
            return Ok(Vec::new());
        }
        self.check_limits(buffers)?;

        let output_size = std::mem::size_of_val(buffers.particles.as_slice()) as u64;

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let params_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Gravity Params Buffer"),
                contents: bytemuck::cast_slice(&[buffers.params]),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let input_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Particle Input Buffer"),
                contents: bytemuck::cast_slice(&buffers.particles),
                usage: wgpu::BufferUsages::STORAGE,
            });

        let cell_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Grid Cell Buffer"),
                contents: bytemuck::cast_slice(&buffers.cells),
                usage: wgpu::BufferUsages::STORAGE,
            });

        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Cell Index Buffer"),
                contents: bytemuck::cast_slice(&buffers.indices),
                usage: wgpu::BufferUsages::STORAGE,
            });

        let output_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Output Buffer"),
            size: output_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Readback Buffer"),
            size: output_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Grid Gravity Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: input_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: cell_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: index_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: output_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Grid Gravity Encoder"),
            });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Grid Gravity Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&self.pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            compute_pass.dispatch_workgroups((count as u32).div_ceil(WORKGROUP_SIZE), 1, 1);
        }

        encoder.copy_buffer_to_buffer(&output_buffer, 0, &staging_buffer, 0, output_size);
        self.queue.submit(std::iter::once(encoder.finish()));

        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(BackendError::Dispatch(error.to_string()));
        }

        let particles = self.read_back(&staging_buffer)?;
        log::debug!("Offloaded step for {} particles", particles.len());
        Ok(particles)
    }
}
