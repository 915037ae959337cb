//! A single toplevel window, and the state machine that gets it on screen
//!
//! Everything the session needs lives in [`Window`]: the connection, the object ids, the pixel
//! buffer and the setup stage. The compositor drives it. We read whatever it sends, dispatch every
//! complete message in it, then give [`Window::set_up`] a chance to move to the next stage.

use log::{debug, info, warn};

use crate::wayland::{
    connection::Connection,
    interfaces::{wl_compositor, wl_display, wl_surface, xdg_surface, xdg_toplevel, xdg_wm_base},
    ObjectManager, WlDynObj,
};
use crate::Error;

mod buffer;
mod dispatch;

use buffer::PixelBuffer;

/// Where we are in getting the window on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Waiting for the compositor and xdg_wm_base globals
    None,
    /// Both globals are bound
    InterfacesBound,
    /// The surface, xdg_surface and toplevel exist, and we are waiting to be configured
    SurfaceChainCreated,
    /// The first configure was acknowledged
    ConfigureAcked,
    /// A buffer is attached and frame callbacks keep it fresh
    BufferAttached,
}

/// What the window should look like before the compositor has its say
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    /// Used until the compositor suggests a size, and whenever it lets us pick
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub app_id: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            title: "rawland".to_owned(),
            app_id: "rawland".to_owned(),
        }
    }
}

#[derive(Debug)]
pub struct Window {
    conn: Connection,
    objects: ObjectManager,
    stage: Stage,
    pixels: PixelBuffer,
    shm_formats: Vec<u32>,
    title: String,
    app_id: String,
    closed: bool,
}

impl Window {
    /// Starts a session over `conn`, asking the compositor for its globals
    pub fn new(mut conn: Connection, config: WindowConfig) -> Result<Self, Error> {
        let WindowConfig {
            width,
            height,
            title,
            app_id,
        } = config;
        let pixels = PixelBuffer::new(width, height)?;

        let mut objects = ObjectManager::new();
        let registry = objects.bind(WlDynObj::Registry);
        wl_display::req::get_registry(&mut conn, registry)?;

        Ok(Self {
            conn,
            objects,
            stage: Stage::None,
            pixels,
            shm_formats: Vec::new(),
            title,
            app_id,
            closed: false,
        })
    }

    /// Processes compositor events until the window is closed
    pub fn run(&mut self) -> Result<(), Error> {
        info!("waiting for the compositor...");
        while !self.closed {
            self.conn.receive()?;
            let inbox = self.conn.take_inbox();
            let consumed = self.dispatch(&inbox)?;
            self.conn.keep_unread(inbox, consumed);
            if !self.closed {
                self.set_up()?;
            }
        }
        info!("window was closed");
        Ok(())
    }

    /// Moves through every [`Stage`] whose preconditions are met
    ///
    /// Calling this again without anything new from the compositor does nothing.
    pub fn set_up(&mut self) -> Result<(), Error> {
        if self.stage == Stage::None
            && self.objects.get(WlDynObj::Compositor).is_some()
            && self.objects.get(WlDynObj::WmBase).is_some()
        {
            self.stage = Stage::InterfacesBound;
        }

        if self.stage == Stage::InterfacesBound {
            self.create_surface_chain()?;
            self.stage = Stage::SurfaceChainCreated;
            debug!("created surface, waiting for the first configure");
        }

        if self.stage == Stage::ConfigureAcked
            && self.objects.get(WlDynObj::Shm).is_some()
            && self.objects.get(WlDynObj::ShmPool).is_none()
            && self.pixels.width() > 0
            && self.pixels.height() > 0
        {
            self.present(true)?;
            self.stage = Stage::BufferAttached;
            info!(
                "attached first {}x{} buffer",
                self.pixels.width(),
                self.pixels.height()
            );
        }
        Ok(())
    }

    fn create_surface_chain(&mut self) -> Result<(), Error> {
        let compositor = self.objects.require(WlDynObj::Compositor)?;
        let wm_base = self.objects.require(WlDynObj::WmBase)?;

        let surface = self.objects.bind(WlDynObj::Surface);
        wl_compositor::req::create_surface(&mut self.conn, compositor, surface)?;

        let xdg_surface = self.objects.bind(WlDynObj::XdgSurface);
        xdg_wm_base::req::get_xdg_surface(&mut self.conn, wm_base, xdg_surface, surface)?;

        let toplevel = self.objects.bind(WlDynObj::Toplevel);
        xdg_surface::req::get_toplevel(&mut self.conn, xdg_surface, toplevel)?;
        xdg_toplevel::req::set_title(&mut self.conn, toplevel, &self.title)?;
        xdg_toplevel::req::set_app_id(&mut self.conn, toplevel, &self.app_id)?;

        // an initial commit without a buffer, so the compositor configures us
        wl_surface::req::commit(&mut self.conn, surface)
    }

    /// Asks the compositor to destroy the window's objects, then disconnects
    pub fn destroy(mut self) {
        if let Err(e) = self.tear_down() {
            warn!("failed to destroy window cleanly: {e}");
        }
        debug!("disconnecting from the compositor");
    }

    fn tear_down(&mut self) -> Result<(), Error> {
        // roles go before the objects they were given to
        if let Some(toplevel) = self.objects.get(WlDynObj::Toplevel) {
            xdg_toplevel::req::destroy(&mut self.conn, toplevel)?;
        }
        if let Some(xdg_surface) = self.objects.get(WlDynObj::XdgSurface) {
            xdg_surface::req::destroy(&mut self.conn, xdg_surface)?;
        }
        if let Some(surface) = self.objects.get(WlDynObj::Surface) {
            wl_surface::req::destroy(&mut self.conn, surface)?;
        }
        Ok(())
    }

    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub const fn objects(&self) -> &ObjectManager {
        &self.objects
    }

    /// Width, height and stride of the next buffer
    #[must_use]
    pub const fn size(&self) -> (u32, u32, u32) {
        (
            self.pixels.width(),
            self.pixels.height(),
            self.pixels.stride(),
        )
    }

    /// The contents of the most recently presented buffer
    #[must_use]
    pub fn pixels(&self) -> Option<&[u8]> {
        self.pixels.pixels()
    }

    /// Pixel formats the compositor advertised through `wl_shm`
    #[must_use]
    pub fn shm_formats(&self) -> &[u32] {
        &self.shm_formats
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests;
