//! A deferred renderer declared on the frame graph.
//!
//! Every renderer feature registers its own resources and passes each frame
//! and decides on its own whether to take part:
//!
//! - The ray tracer rebuilds the TLAS until it is ready.
//! - The G-buffer needs the TLAS; compositing and luminance reduction need
//!   the G-buffer and leave the frame together with it.
//! - TAA joins once the warm-up frames are over.
//! - The final pass, the GUI and the present transition run every frame.

use framegraph::{
    DoubleBuffered, DummyBackend, ExecutionReport, Frame, FrameGraph, FrameParity, GpuBackend,
    GraphError, PassKind, ResourceHandle, ResourceId, ResourceState,
};
use framegraph_core::profiling::{frame_mark, profile_scope};

const TLAS: ResourceId = ResourceId::from_path("RayTracer/TLAS");
const HDR_LIGHT_ACCUM: ResourceId = ResourceId::from_path("LightManager/HdrLightAccum");
const AVG_LUMINANCE: ResourceId =
    ResourceId::from_path("PostProcessor/LuminanceReduction/AvgLum");

/// Compositing has written the lit image.
const COMPOSITED: ResourceId = ResourceId::synthetic(0);
/// The final pass has drawn into the back buffer.
const FINAL_DRAWN: ResourceId = ResourceId::synthetic(1);
/// The GUI has been drawn over the final image.
const GUI_DRAWN: ResourceId = ResourceId::synthetic(2);

/// Shader-visible reads use one state so readers never transition between
/// each other.
const SHADER_READ: ResourceState = ResourceState::ALL_SHADER_RESOURCE;

/// Feature toggles of the demo renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSettings {
    /// Run temporal anti-aliasing after the warm-up.
    pub taa: bool,
    /// Frames rendered before TAA is allowed to run.
    pub warmup_frames: u64,
    /// Frames spent building the TLAS before the G-buffer can trace it.
    pub tlas_build_frames: u64,
    /// Render the execution order as Graphviz DOT every frame.
    pub capture_dot: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            taa: true,
            warmup_frames: 2,
            tlas_build_frames: 1,
            capture_dot: false,
        }
    }
}

/// What one rendered frame did.
#[derive(Debug, Clone)]
pub struct FrameOutput {
    /// Execution statistics.
    pub report: ExecutionReport,
    /// Pass names in execution order.
    pub passes: Vec<String>,
    /// Execution order as DOT, if requested.
    pub dot: Option<String>,
}

/// Resources and feature state of the demo renderer.
#[derive(Debug)]
pub struct DemoRenderer {
    settings: RenderSettings,
    tlas: ResourceHandle,
    tlas_builds: u64,
    depth: DoubleBuffered<ResourceHandle>,
    base_color: DoubleBuffered<ResourceHandle>,
    hdr_light_accum: ResourceHandle,
    taa_output: DoubleBuffered<ResourceHandle>,
    avg_luminance: ResourceHandle,
    back_buffers: DoubleBuffered<ResourceHandle>,
}

impl DemoRenderer {
    /// Allocate the renderer's resources on `backend`.
    pub fn new(backend: &DummyBackend, settings: RenderSettings) -> Self {
        let pair = |name: &str| {
            DoubleBuffered::new(
                name,
                backend.create_resource(&format!("{name}/0")),
                backend.create_resource(&format!("{name}/1")),
            )
        };

        Self {
            tlas: backend.create_resource("RayTracer/TLAS"),
            tlas_builds: 0,
            depth: pair("GBuffer/Depth"),
            base_color: pair("GBuffer/BaseColor"),
            hdr_light_accum: backend.create_resource("LightManager/HdrLightAccum"),
            taa_output: pair("PostProcessor/TAA/Output"),
            avg_luminance: backend.create_resource("PostProcessor/LuminanceReduction/AvgLum"),
            back_buffers: pair("Swapchain/BackBuffer"),
            settings,
        }
    }

    /// Get the settings.
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Change the settings; takes effect with the next frame.
    pub fn settings_mut(&mut self) -> &mut RenderSettings {
        &mut self.settings
    }

    /// Check if the TLAS can be traced against.
    pub fn tlas_ready(&self) -> bool {
        self.tlas_builds >= self.settings.tlas_build_frames
    }

    /// Declare, record and submit one frame.
    pub fn render_frame(
        &mut self,
        graph: &mut FrameGraph,
        backend: &dyn GpuBackend,
    ) -> Result<FrameOutput, GraphError> {
        profile_scope!("render_frame");

        let mut frame = graph.begin_frame();
        let frame_index = frame.frame_index();
        let parity = FrameParity::from_frame(frame_index);
        let gbuffer_ready = self.tlas_ready();

        self.register_ray_tracer(&mut frame)?;
        self.register_gbuffer(&mut frame, parity, gbuffer_ready)?;
        self.register_compositing(&mut frame, parity, gbuffer_ready)?;
        self.register_post_processing(&mut frame, parity, frame_index, gbuffer_ready)?;

        let order = frame.build()?;
        let passes = order
            .pass_order()
            .iter()
            .filter_map(|&handle| order.pass_name(handle))
            .map(str::to_string)
            .collect();
        let dot = self.settings.capture_dot.then(|| order.to_dot());
        let report = frame.execute(&order, backend)?;

        frame_mark!();
        Ok(FrameOutput {
            report,
            passes,
            dot,
        })
    }

    fn register_ray_tracer(&mut self, frame: &mut Frame<'_, '_>) -> Result<(), GraphError> {
        frame.register_tracked_resource(
            TLAS,
            self.tlas,
            ResourceState::RAYTRACING_ACCELERATION_STRUCTURE,
        )?;
        if self.tlas_ready() {
            return Ok(());
        }

        let build = frame.register_pass("BuildTLAS", PassKind::Compute, |ctx| {
            ctx.dispatch(256, 1, 1);
        })?;
        frame.add_output(build, TLAS, ResourceState::RAYTRACING_ACCELERATION_STRUCTURE)?;
        self.tlas_builds += 1;
        Ok(())
    }

    fn register_gbuffer(
        &self,
        frame: &mut Frame<'_, '_>,
        parity: FrameParity,
        ready: bool,
    ) -> Result<(), GraphError> {
        if !ready {
            log::debug!("GBuffer: TLAS not ready, skipping");
            return Ok(());
        }

        for (id, &handle) in self.depth.iter().chain(self.base_color.iter()) {
            frame.register_tracked_resource(id, handle, ResourceState::COMMON)?;
        }

        let gbuffer = frame.register_pass("GBuffer", PassKind::Compute, |ctx| {
            ctx.dispatch(240, 135, 1);
        })?;
        frame.add_input(gbuffer, TLAS, ResourceState::RAYTRACING_ACCELERATION_STRUCTURE)?;
        let (base_color, _) = self.base_color.current(parity);
        let (depth, _) = self.depth.current(parity);
        frame.add_output(gbuffer, base_color, ResourceState::UNORDERED_ACCESS)?;
        frame.add_output(gbuffer, depth, ResourceState::UNORDERED_ACCESS)?;
        Ok(())
    }

    fn register_compositing(
        &self,
        frame: &mut Frame<'_, '_>,
        parity: FrameParity,
        gbuffer_ready: bool,
    ) -> Result<(), GraphError> {
        frame.register_tracked_resource(
            HDR_LIGHT_ACCUM,
            self.hdr_light_accum,
            ResourceState::COMMON,
        )?;
        // Reads this frame's G-buffer.
        if !gbuffer_ready {
            return Ok(());
        }

        frame.register_order_token(COMPOSITED)?;
        let compositing = frame.register_pass("Compositing", PassKind::Compute, |ctx| {
            ctx.dispatch(240, 135, 1);
        })?;
        frame.add_input(compositing, self.depth.current(parity).0, SHADER_READ)?;
        frame.add_input(compositing, self.base_color.current(parity).0, SHADER_READ)?;
        frame.add_output(compositing, HDR_LIGHT_ACCUM, ResourceState::UNORDERED_ACCESS)?;
        frame.add_order_output(compositing, COMPOSITED)?;
        Ok(())
    }

    fn register_post_processing(
        &self,
        frame: &mut Frame<'_, '_>,
        parity: FrameParity,
        frame_index: u64,
        gbuffer_ready: bool,
    ) -> Result<(), GraphError> {
        frame.register_tracked_resource(
            AVG_LUMINANCE,
            self.avg_luminance,
            ResourceState::COMMON,
        )?;
        for (id, &handle) in self.taa_output.iter() {
            frame.register_tracked_resource(id, handle, ResourceState::COMMON)?;
        }
        let (back_buffer, &back_buffer_handle) = self.back_buffers.current(parity);
        frame.register_tracked_resource(back_buffer, back_buffer_handle, ResourceState::PRESENT)?;
        frame.register_order_token(FINAL_DRAWN)?;
        frame.register_order_token(GUI_DRAWN)?;

        if gbuffer_ready {
            let reduction = frame.register_pass("LuminanceReduction", PassKind::Compute, |ctx| {
                ctx.dispatch(60, 34, 1);
                ctx.dispatch(1, 1, 1);
            })?;
            frame.add_order_input(reduction, COMPOSITED)?;
            frame.add_input(reduction, HDR_LIGHT_ACCUM, SHADER_READ)?;
            frame.add_output(reduction, AVG_LUMINANCE, ResourceState::UNORDERED_ACCESS)?;
        }

        let taa = self.settings.taa && gbuffer_ready && frame_index > self.settings.warmup_frames;
        let tonemap_source = if taa {
            let (current, _) = self.taa_output.current(parity);
            let (previous, _) = self.taa_output.previous(parity);
            let pass = frame.register_pass("TAA", PassKind::Compute, |ctx| {
                ctx.dispatch(240, 135, 1);
            })?;
            frame.add_order_input(pass, COMPOSITED)?;
            frame.add_input(pass, self.depth.current(parity).0, SHADER_READ)?;
            frame.add_input(pass, HDR_LIGHT_ACCUM, SHADER_READ)?;
            frame.add_input(pass, previous, SHADER_READ)?;
            frame.add_output(pass, current, ResourceState::UNORDERED_ACCESS)?;
            current
        } else {
            HDR_LIGHT_ACCUM
        };

        let final_pass = frame.register_pass("Final", PassKind::Graphics, |ctx| {
            ctx.draw(3, 1);
        })?;
        frame.add_input(final_pass, tonemap_source, SHADER_READ)?;
        frame.add_input(final_pass, AVG_LUMINANCE, SHADER_READ)?;
        frame.add_output(final_pass, back_buffer, ResourceState::RENDER_TARGET)?;
        frame.add_order_output(final_pass, FINAL_DRAWN)?;

        // Blends over the final image, so it goes last.
        let gui = frame.register_pass("GUI", PassKind::Graphics, |ctx| {
            ctx.draw(6, 24);
        })?;
        frame.add_order_input(gui, FINAL_DRAWN)?;
        frame.add_input(gui, back_buffer, ResourceState::RENDER_TARGET)?;
        frame.add_output(gui, back_buffer, ResourceState::RENDER_TARGET)?;
        frame.add_order_output(gui, GUI_DRAWN)?;

        // Records nothing; its barrier hands the back buffer to the swapchain.
        let present = frame.register_pass("Present", PassKind::Graphics, |_| {})?;
        frame.add_order_input(present, GUI_DRAWN)?;
        frame.add_input(present, back_buffer, ResourceState::PRESENT)?;
        Ok(())
    }
}
