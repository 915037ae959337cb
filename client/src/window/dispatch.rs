use log::{debug, info, warn};

use super::{Stage, Window};
use crate::wayland::{
    interfaces::{
        wl_buffer, wl_callback, wl_display, wl_output, wl_registry, wl_shm, wl_surface,
        xdg_surface, xdg_toplevel, xdg_wm_base,
    },
    wire::{Header, Reader, HEADER_LEN},
    ObjectId, WlDynObj,
};
use crate::Error;

/// The globals we bind, and the highest version of each we know how to speak
const SUPPORTED_GLOBALS: [(&str, WlDynObj, u32); 4] = [
    ("wl_compositor", WlDynObj::Compositor, 6),
    ("wl_shm", WlDynObj::Shm, 2),
    ("xdg_wm_base", WlDynObj::WmBase, 6),
    ("wl_output", WlDynObj::Output, 4),
];

impl Window {
    /// Handles every complete message at the start of `bytes`, in order
    ///
    /// Returns how many bytes that was. Whatever is left is the beginning of a message that has
    /// not fully arrived yet. Processing stops at the first error, so nothing after a
    /// `wl_display.error` is looked at.
    pub fn dispatch(&mut self, bytes: &[u8]) -> Result<usize, Error> {
        let mut consumed = 0;
        while bytes.len() - consumed >= HEADER_LEN {
            let rest = &bytes[consumed..];
            let mut message = Reader::new(rest);
            let header = Header::read(&mut message)?;
            let size = header.size as usize;
            if size < HEADER_LEN || size % 4 != 0 {
                return Err(Error::Framing {
                    object_id: header.object_id,
                    opcode: header.opcode,
                    size: header.size,
                });
            }
            if size > rest.len() {
                break;
            }

            let mut args = Reader::new(message.read_n(size - HEADER_LEN)?);
            consumed += size;
            self.route(header, &mut args)?;
        }
        Ok(consumed)
    }

    fn route(&mut self, header: Header, args: &mut Reader) -> Result<(), Error> {
        let Header {
            object_id, opcode, ..
        } = header;
        let Some((sender_id, object)) = ObjectId::from_raw(object_id)
            .and_then(|id| self.objects.current(id).map(|object| (id, object)))
        else {
            debug!("skipping event {opcode} for unknown object {object_id}");
            return Ok(());
        };

        match object {
            WlDynObj::Display => wl_display::event(self, sender_id, opcode, args),
            WlDynObj::Registry => wl_registry::event(self, sender_id, opcode, args),
            WlDynObj::Output => wl_output::event(self, sender_id, opcode, args),
            WlDynObj::Shm => wl_shm::event(self, sender_id, opcode, args),
            WlDynObj::Buffer => wl_buffer::event(self, sender_id, opcode, args),
            WlDynObj::Surface => wl_surface::event(self, sender_id, opcode, args),
            WlDynObj::WmBase => xdg_wm_base::event(self, sender_id, opcode, args),
            WlDynObj::XdgSurface => xdg_surface::event(self, sender_id, opcode, args),
            WlDynObj::Toplevel => xdg_toplevel::event(self, sender_id, opcode, args),
            WlDynObj::Callback => wl_callback::event(self, sender_id, opcode, args),
            // these interfaces have no events
            WlDynObj::Compositor | WlDynObj::ShmPool => {
                debug!("skipping event {opcode} for {}", object.interface());
                Ok(())
            }
        }
    }
}

impl wl_display::EvHandler for Window {
    fn error(&mut self, object_id: u32, code: u32, message: &str) -> Result<(), Error> {
        let interface = ObjectId::from_raw(object_id)
            .and_then(|id| self.objects.lookup(id))
            .map_or("???", |object| object.interface());
        Err(Error::Protocol {
            object_id,
            interface,
            code,
            message: message.to_owned(),
        })
    }

    fn delete_id(&mut self, id: u32) -> Result<(), Error> {
        if let Some(id) = ObjectId::from_raw(id) {
            self.objects.remove(id);
        }
        Ok(())
    }
}

impl wl_registry::EvHandler for Window {
    fn global(&mut self, name: u32, interface: &str, version: u32) -> Result<(), Error> {
        let Some((interface, object, max_version)) = SUPPORTED_GLOBALS
            .into_iter()
            .find(|(supported, _, _)| *supported == interface)
        else {
            return Ok(());
        };

        if self.objects.get(object).is_some() {
            debug!("ignoring additional {interface} global {name}");
            return Ok(());
        }

        let registry = self.objects.require(WlDynObj::Registry)?;
        let version = version.min(max_version);
        let id = self.objects.bind(object);
        wl_registry::req::bind(&mut self.conn, registry, name, interface, version, id)?;
        debug!("bound {interface} v{version} as object {id}");
        Ok(())
    }

    fn global_remove(&mut self, name: u32) -> Result<(), Error> {
        debug!("global {name} was removed");
        Ok(())
    }
}

impl wl_output::EvHandler for Window {
    fn mode(
        &mut self,
        _sender_id: ObjectId,
        _flags: u32,
        width: i32,
        height: i32,
        refresh: i32,
    ) -> Result<(), Error> {
        info!("output mode: {width}x{height} at {refresh} mHz");
        Ok(())
    }

    fn scale(&mut self, _sender_id: ObjectId, factor: i32) -> Result<(), Error> {
        debug!("output scale: {factor}");
        Ok(())
    }

    fn name(&mut self, _sender_id: ObjectId, name: &str) -> Result<(), Error> {
        debug!("output name: {name}");
        Ok(())
    }
}

impl wl_shm::EvHandler for Window {
    fn format(&mut self, format: u32) -> Result<(), Error> {
        if !self.shm_formats.contains(&format) {
            self.shm_formats.push(format);
        }
        Ok(())
    }
}

impl wl_buffer::EvHandler for Window {
    fn release(&mut self, _sender_id: ObjectId) -> Result<(), Error> {
        // buffers are never reused, so there is nothing to do
        Ok(())
    }
}

impl wl_surface::EvHandler for Window {
    fn enter(&mut self, _sender_id: ObjectId, output: u32) -> Result<(), Error> {
        debug!("surface entered output {output}");
        Ok(())
    }

    fn leave(&mut self, _sender_id: ObjectId, output: u32) -> Result<(), Error> {
        debug!("surface left output {output}");
        Ok(())
    }
}

impl xdg_wm_base::EvHandler for Window {
    fn ping(&mut self, serial: u32) -> Result<(), Error> {
        let wm_base = self.objects.require(WlDynObj::WmBase)?;
        xdg_wm_base::req::pong(&mut self.conn, wm_base, serial)
    }
}

impl xdg_surface::EvHandler for Window {
    fn configure(&mut self, serial: u32) -> Result<(), Error> {
        let xdg_surface = self.objects.require(WlDynObj::XdgSurface)?;
        xdg_surface::req::ack_configure(&mut self.conn, xdg_surface, serial)?;
        if self.stage == Stage::SurfaceChainCreated {
            self.stage = Stage::ConfigureAcked;
        }
        Ok(())
    }
}

impl xdg_toplevel::EvHandler for Window {
    fn configure(&mut self, width: i32, height: i32, states: &[u8]) -> Result<(), Error> {
        debug!(
            "toplevel configure: {width}x{height}, {} states",
            states.len() / 4
        );
        // zero means we get to pick, so we keep what we have
        if let (Ok(width @ 1..), Ok(height @ 1..)) = (u32::try_from(width), u32::try_from(height)) {
            // a suggestion we cannot allocate is ignored, like any other the client may refuse
            if let Err(e) = self.pixels.resize(width, height) {
                warn!("keeping current size: {e}");
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        self.closed = true;
        Ok(())
    }

    fn configure_bounds(&mut self, width: i32, height: i32) -> Result<(), Error> {
        debug!("toplevel bounds: {width}x{height}");
        Ok(())
    }

    fn wm_capabilities(&mut self, capabilities: &[u8]) -> Result<(), Error> {
        debug!("compositor has {} window manager capabilities", capabilities.len() / 4);
        Ok(())
    }
}

impl wl_callback::EvHandler for Window {
    fn done(&mut self, _sender_id: ObjectId, _callback_data: u32) -> Result<(), Error> {
        let surface = self.objects.require(WlDynObj::Surface)?;
        let callback = self.objects.bind(WlDynObj::Callback);
        wl_surface::req::frame(&mut self.conn, surface, callback)?;
        self.present(false)
    }
}
