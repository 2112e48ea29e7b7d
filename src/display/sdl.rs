//! SDL2 window backend for the screen surface

use super::{expand_frame, BufferLayout, PresentationLayer};
use crate::palette::{Color, PALETTE_SIZE};
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::{Canvas, Texture, TextureCreator};
use sdl2::video::{Window, WindowContext};
use sdl2::EventPump;

pub struct Display {
    canvas: Canvas<Window>,
    width: u32,
    height: u32,
}

pub struct EventQueue {
    event_pump: EventPump,
}

#[derive(Debug, Clone)]
pub enum InputEvent {
    Quit,
    KeyDown(Keycode),
}

impl Display {
    /// Open a window of `width * scale` by `height * scale` for a
    /// `width` x `height` frame
    pub fn with_options(
        title: &str,
        width: u32,
        height: u32,
        scale: u32,
        vsync: bool,
    ) -> Result<(Self, EventQueue, TextureCreator<WindowContext>), String> {
        let sdl_context = sdl2::init()?;
        let video_subsystem = sdl_context.video()?;
        let scale = scale.max(1);

        let window = video_subsystem
            .window(title, width * scale, height * scale)
            .position_centered()
            .build()
            .map_err(|e| e.to_string())?;

        let mut canvas_builder = window.into_canvas().accelerated();
        if vsync {
            canvas_builder = canvas_builder.present_vsync();
        }
        let canvas = canvas_builder.build().map_err(|e| e.to_string())?;

        let texture_creator = canvas.texture_creator();
        let event_pump = sdl_context.event_pump()?;

        Ok((
            Self {
                canvas,
                width,
                height,
            },
            EventQueue { event_pump },
            texture_creator,
        ))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl EventQueue {
    pub fn poll_events(&mut self) -> Vec<InputEvent> {
        let mut events = Vec::new();

        for event in self.event_pump.poll_iter() {
            match event {
                Event::Quit { .. } => events.push(InputEvent::Quit),
                Event::KeyDown {
                    keycode: Some(k), ..
                } => events.push(InputEvent::KeyDown(k)),
                _ => {},
            }
        }

        events
    }
}

/// Screen back buffer backed by an SDL streaming texture.
///
/// The 8-bit frame is expanded to RGBA8888 through the palette on present.
pub struct SdlPresenter<'t> {
    display: Display,
    texture: Texture<'t>,
    layout: BufferLayout,
    pixels: Vec<u8>,
    rgba: Vec<u8>,
}

impl<'t> SdlPresenter<'t> {
    pub fn new(
        display: Display,
        texture_creator: &'t TextureCreator<WindowContext>,
    ) -> Result<Self, String> {
        let (width, height) = (display.width(), display.height());
        let texture = texture_creator
            .create_texture_streaming(PixelFormatEnum::RGBA8888, width, height)
            .map_err(|e| e.to_string())?;
        let layout = BufferLayout::packed(width as i32, height as i32);
        Ok(Self {
            display,
            texture,
            layout,
            pixels: vec![0; (width * height) as usize],
            rgba: vec![0; (width * height * 4) as usize],
        })
    }
}

impl PresentationLayer for SdlPresenter<'_> {
    fn is_initialized(&self) -> bool {
        true
    }

    fn acquire(&mut self) -> Option<BufferLayout> {
        Some(self.layout)
    }

    fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    fn present(&mut self, palette: &[Color; PALETTE_SIZE]) -> Result<(), String> {
        expand_frame(&self.pixels, self.layout, palette, &mut self.rgba);
        self.texture
            .update(None, &self.rgba, (self.layout.width * 4) as usize)
            .map_err(|e| e.to_string())?;

        let canvas = &mut self.display.canvas;
        canvas.copy(&self.texture, None, None)?;
        canvas.present();
        Ok(())
    }
}
