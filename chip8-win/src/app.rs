use std::path::Path;

use chip8::{constants::*, prelude::*, Clock, Hz};
use log::info;
use winit::{
    dpi::LogicalSize,
    event::{Event as EV, WindowEvent as WE},
    event_loop::EventLoopBuilder,
    platform::run_return::EventLoopExtRunReturn,
};

use crate::{
    actions::*, config::AppConfig, error::AppError, render::Render, window::WindowContext,
    EventLoop, InputMap,
};

/// Chip8 Application
pub struct Chip8App {
    window: WindowContext,
    render: Render,
    vm: Chip8Vm,
    input_map: InputMap,
    clock: Clock,
    screen: Screen,
}

/// Host side of the VM devices.
///
/// Keeps a copy of the last presented frame, so the window
/// can be redrawn without involving the VM.
struct Screen {
    keys: [bool; KEY_COUNT as usize],
    pixels: Box<[bool; DISPLAY_BUFFER_SIZE]>,
    dirty: bool,
}

impl Devices for Screen {
    fn keys(&mut self) -> [bool; KEY_COUNT as usize] {
        self.keys
    }

    fn draw(&mut self, display: Chip8DisplayBuffer) {
        self.pixels.copy_from_slice(display);
        self.dirty = true;
    }

    fn tone_stop(&mut self) {
        info!("tone stop");
    }
}

impl Chip8App {
    /// Create the Chip8 window app.
    pub fn new(event_loop: &EventLoop, config: &AppConfig) -> Result<Self, AppError> {
        let inner_size = LogicalSize::new(
            DISPLAY_WIDTH as u32 * config.scale,
            DISPLAY_HEIGHT as u32 * config.scale,
        );
        let window = WindowContext::new(event_loop, inner_size)?;

        let render = Render::new(window.gl.clone(), config.scale);
        info!("Created OpenGL renderer:\n{}", render.opengl_info());

        Ok(Self {
            window,
            render,
            vm: Chip8Vm::new(config.vm.clone()),
            input_map: InputMap::new(&config.keys),
            clock: Clock::new(Hz::default()),
            screen: Screen {
                keys: [false; KEY_COUNT as usize],
                pixels: Box::new([false; DISPLAY_BUFFER_SIZE]),
                dirty: true,
            },
        })
    }

    pub fn create_event_loop() -> EventLoop {
        EventLoopBuilder::new().build()
    }

    /// Load ROM file into VM
    pub fn load_rom(&mut self, filepath: impl AsRef<Path>) -> Result<(), AppError> {
        let size = self.vm.load_file(filepath)?;
        info!("loaded rom: {size} bytes");

        Ok(())
    }

    fn redraw(&mut self) -> Result<(), AppError> {
        self.window.make_context_current()?;
        self.render.draw_display(
            &self.screen.pixels,
            self.window.inner_size(),
            self.window.scale_factor(),
        );
        self.window.swap_buffers()?;
        self.screen.dirty = false;

        Ok(())
    }
}

/// Event Loop.
impl Chip8App {
    pub fn run(&mut self, event_loop: &mut EventLoop) -> Result<(), AppError> {
        let main_window_id = self.window.window_id();
        let mut result = Ok(());

        self.clock.reset();

        event_loop.run_return(|event, _, control_flow| {
            control_flow.set_poll();

            match event {
                EV::MainEventsCleared => {
                    // Frame Update

                    if self.input_map.is_action_pressed(EXIT) {
                        info!("Exit");
                        control_flow.set_exit();
                        return;
                    }

                    if !self.clock.tick() {
                        return;
                    }

                    self.screen.keys = self.input_map.chip8_keys();
                    if let Err(err) = self.vm.run_frame(&mut self.screen) {
                        log::debug!("\n{}", self.vm.dump_registers().unwrap_or_default());
                        result = Err(err.into());
                        control_flow.set_exit();
                        return;
                    }

                    if let Ok(keys) = self.vm.dump_keys() {
                        if !keys.is_empty() {
                            log::trace!("{keys}");
                        }
                    }

                    if self.screen.dirty {
                        self.window.request_redraw();
                    }
                }
                EV::RedrawRequested(window_id) if window_id == main_window_id => {
                    if let Err(err) = self.redraw() {
                        result = Err(err);
                        control_flow.set_exit();
                    }
                }
                EV::WindowEvent { window_id, event } if window_id == main_window_id => {
                    match event {
                        WE::Resized(size) => {
                            self.window.resize_surface(size);
                            self.render.resize_viewport(size);
                            self.window.request_redraw();
                        }
                        WE::KeyboardInput { input, .. } => {
                            if let Some(virtual_keycode) = input.virtual_keycode {
                                self.input_map.push_key(virtual_keycode, input.state);
                            }
                        }
                        WE::Focused(false) => {
                            // Release events are lost while unfocused.
                            self.input_map.clear_state();
                            self.vm.clear_keys();
                        }
                        WE::CloseRequested => {
                            control_flow.set_exit();
                        }
                        _ => { /* blank */ }
                    }
                }
                _ => { /* blank */ }
            }
        });

        result
    }
}
