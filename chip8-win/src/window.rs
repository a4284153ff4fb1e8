use std::num::NonZeroU32;
use std::rc::Rc;

use glutin::config::{Config as GlutinConfig, ConfigTemplateBuilder, GlConfig};
use glutin::context::{ContextApi, ContextAttributesBuilder, GlProfile, Version as GlVersion};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin::surface::{GlSurface, SwapInterval, WindowSurface};
use glutin_winit::GlWindow;
use raw_window_handle::HasRawWindowHandle;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::window::WindowBuilder;

use crate::{
    error::{AppError, ErrorKind},
    EventLoop,
};

pub struct WindowContext {
    pub(crate) window: winit::window::Window,
    pub(crate) gl_context: glutin::context::PossiblyCurrentContext,
    pub(crate) gl_surface: glutin::surface::Surface<WindowSurface>,
    pub(crate) gl: Rc<glow::Context>,
}

impl WindowContext {
    /// Create a Window with an OpenGL context.
    ///
    /// - For Windows, the main window must be created first, for the OpenGL
    ///   context to be created.
    /// - For Android, the OpenGL context is created before the window exists.
    pub fn new(event_loop: &EventLoop, inner_size: LogicalSize<u32>) -> Result<Self, AppError> {
        // --------------------------------------------------------------------
        // Window

        let window_builder = WindowBuilder::new()
            .with_resizable(true)
            .with_inner_size(inner_size)
            .with_title("chip8");

        let template = ConfigTemplateBuilder::new().prefer_hardware_accelerated(Some(true));

        // Helper crate handles the cross-platform complexity of setting up an OpenGL context.
        let (window, gl_config) = glutin_winit::DisplayBuilder::new()
            .with_preference(glutin_winit::ApiPrefence::FallbackEgl)
            .with_window_builder(Some(window_builder.clone()))
            .build(event_loop, template, pick_config)
            .map_err(|err| AppError {
                kind: ErrorKind::Platform(err.to_string()),
            })?;

        log::info!(
            "picked GL config with {} samples, hardware accelerated: {}",
            gl_config.num_samples(),
            gl_config.hardware_accelerated()
        );

        // On Android, the window is not available when the OpenGL display has to be created.
        // However on Windows the main window must first exist before OpenGL can be initialized.
        let window = match window {
            Some(window) => window,
            None => {
                log::info!("creating window with finalize_window");
                glutin_winit::finalize_window(event_loop, window_builder, &gl_config)?
            }
        };

        // --------------------------------------------------------------------
        // OpenGL Context

        // Raw handle is required to build the OpenGL context.
        let raw_window_handle = window.raw_window_handle();

        // The display could be obtained from any object created by it, so we
        // can query it from the config.
        let gl_display = gl_config.display();

        // Scissored clears are all the renderer needs, so any version will do.
        let context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(GlVersion::new(3, 3))))
            .with_profile(GlProfile::Core)
            .build(Some(raw_window_handle));
        let fallback_context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::Gles(None))
            .build(Some(raw_window_handle));

        let not_current_gl_context = unsafe {
            match gl_display.create_context(&gl_config, &context_attributes) {
                Ok(context) => context,
                Err(err) => {
                    log::warn!("falling back to OpenGL ES: {err}");
                    gl_display.create_context(&gl_config, &fallback_context_attributes)?
                }
            }
        };

        // --------------------------------------------------------------------
        // Surface

        let attrs = window.build_surface_attributes(<_>::default());
        let gl_surface = unsafe { gl_display.create_window_surface(&gl_config, &attrs)? };

        // Make context current for the next phase of configuration.
        let gl_context = not_current_gl_context.make_current(&gl_surface)?;

        log::debug!("attempt to set vsync");
        if let Err(err) =
            gl_surface.set_swap_interval(&gl_context, SwapInterval::Wait(NonZeroU32::MIN))
        {
            log::error!("error setting vsync: {err:?}");
        }

        // --------------------------------------------------------------------
        // OpenGL Function Pointers

        // For WGL (Windows) the OpenGL context must be current,
        // otherwise only a subset of functions are loaded.
        if !gl_context.is_current() {
            return Err(AppError {
                kind: ErrorKind::Platform(
                    "context must be current to load OpenGL functions".to_string(),
                ),
            });
        }

        let gl = unsafe {
            Rc::new(glow::Context::from_loader_function_cstr(|symbol| {
                gl_display.get_proc_address(symbol)
            }))
        };

        Ok(Self {
            window,
            gl_context,
            gl_surface,
            gl,
        })
    }

    /// Returns an identifier unique to the window.
    #[inline]
    pub fn window_id(&self) -> winit::window::WindowId {
        self.window.id()
    }

    /// Size of the drawable area, in physical pixels.
    #[inline]
    pub fn inner_size(&self) -> PhysicalSize<u32> {
        self.window.inner_size()
    }

    /// Ratio of physical to logical pixels of the monitor the window is on.
    #[inline]
    pub fn scale_factor(&self) -> f64 {
        self.window.scale_factor()
    }

    /// Queue a redraw event after all OS events have been processed.
    #[inline]
    pub fn request_redraw(&self) {
        self.window.request_redraw()
    }

    /// Swaps the underlying back buffers when the surface is not single buffered.
    #[inline]
    pub fn swap_buffers(&self) -> glutin::error::Result<()> {
        self.gl_surface.swap_buffers(&self.gl_context)
    }

    /// Make the underlying surface current on the calling thread.
    #[inline]
    pub fn make_context_current(&self) -> glutin::error::Result<()> {
        self.gl_context.make_current(&self.gl_surface)
    }

    /// Resize the surface to a new size.
    ///
    /// Does not resize the window.
    ///
    /// This call is for compatibility reasons, on most platforms it's a no-op.
    pub fn resize_surface(&self, size: impl Into<PhysicalSize<u32>>) {
        let size = size.into();
        // Zero sized surface is invalid.
        if let (Some(width), Some(height)) =
            (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
        {
            self.gl_surface.resize(&self.gl_context, width, height);
        }
    }
}

/// Prefer the config with the most samples.
fn pick_config(configs: Box<dyn Iterator<Item = GlutinConfig> + '_>) -> GlutinConfig {
    configs
        .inspect(|c| log::debug!("consider config: num_samples={}", c.num_samples()))
        .reduce(|best, c| {
            if c.num_samples() > best.num_samples() {
                c
            } else {
                best
            }
        })
        .expect("the system must supply at least one GL config")
}
