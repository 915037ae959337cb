//! Wayland Interfaces we care about
//!
//! Only the requests and events `rawland` actually uses are here. Every interface gets its own
//! module, with an `EvHandler` trait for its events, an `event` function that decodes them, and a
//! `req` module with one function per request.
//!
//! Requests are written straight into the connection's scratch buffer. Each one computes the exact
//! size of the message up front, so the connection can refuse to send anything malformed.
//!
//! Events whose opcode we do not know are skipped: the dispatcher always moves on by the size the
//! header announced, no matter how much of the message we read.

use rustix::fd::BorrowedFd;

use super::{
    connection::Connection,
    wire::{str_len, Reader, HEADER_LEN},
    ObjectId, WL_DISPLAY,
};
use crate::Error;

/// size of a single u32, i32 or object argument
const ARG: usize = 4;

fn unrecognized(interface: &str, opcode: u16) -> Result<(), Error> {
    log::debug!("unrecognized event opcode: {opcode} for interface {interface}");
    Ok(())
}

///core global object
///
///The core global object. This is a special singleton object. It is used for internal Wayland
///protocol features.
pub mod wl_display {
    use super::*;

    pub trait EvHandler {
        ///fatal error event
        ///
        ///The object_id argument is the object where the error occurred, most often in response
        ///to a request to that object. The code is defined by that object's interface.
        fn error(&mut self, object_id: u32, code: u32, message: &str) -> Result<(), Error>;
        ///acknowledge object ID deletion
        ///
        ///Sent after the server has seen the destructor of an object we created.
        fn delete_id(&mut self, id: u32) -> Result<(), Error>;
    }

    pub fn event<T: EvHandler>(
        state: &mut T,
        _sender_id: ObjectId,
        opcode: u16,
        args: &mut Reader,
    ) -> Result<(), Error> {
        match opcode {
            0 => {
                let object_id = args.read_u32()?;
                let code = args.read_u32()?;
                let message = args.read_string()?;
                state.error(object_id, code, message)
            }
            1 => {
                let id = args.read_u32()?;
                state.delete_id(id)
            }
            e => unrecognized("wl_display", e),
        }
    }

    ///Requests for this interface
    pub mod req {
        use super::*;

        ///get global registry object
        ///
        ///Creates a registry object that lists the globals available in the compositor.
        pub fn get_registry(conn: &mut Connection, registry: ObjectId) -> Result<(), Error> {
            let msg = conn.begin(WL_DISPLAY, 1, HEADER_LEN + ARG)?;
            msg.write_u32(registry.get())?;
            conn.send()
        }
    }
}

///global registry object
///
///The singleton global registry object. The server has a number of global objects that are
///available to all clients, which it announces through this object.
pub mod wl_registry {
    use super::*;

    pub trait EvHandler {
        ///announce global object
        fn global(&mut self, name: u32, interface: &str, version: u32) -> Result<(), Error>;
        ///announce removal of global object
        fn global_remove(&mut self, name: u32) -> Result<(), Error>;
    }

    pub fn event<T: EvHandler>(
        state: &mut T,
        _sender_id: ObjectId,
        opcode: u16,
        args: &mut Reader,
    ) -> Result<(), Error> {
        match opcode {
            0 => {
                let name = args.read_u32()?;
                let interface = args.read_string()?;
                let version = args.read_u32()?;
                state.global(name, interface, version)
            }
            1 => {
                let name = args.read_u32()?;
                state.global_remove(name)
            }
            e => unrecognized("wl_registry", e),
        }
    }

    ///Requests for this interface
    pub mod req {
        use super::*;

        ///bind an object to the display
        ///
        ///Binds a new, client-created object to the server using the specified name as the
        ///identifier.
        pub fn bind(
            conn: &mut Connection,
            registry: ObjectId,
            name: u32,
            interface: &str,
            version: u32,
            id: ObjectId,
        ) -> Result<(), Error> {
            let size = HEADER_LEN + ARG + str_len(interface) + ARG + ARG;
            let msg = conn.begin(registry, 0, size)?;
            msg.write_u32(name)?;
            msg.write_str(interface)?;
            msg.write_u32(version)?;
            msg.write_u32(id.get())?;
            conn.send()
        }
    }
}

///callback object
///
///Clients can handle the 'done' event to get notified when the related request is done.
pub mod wl_callback {
    use super::*;

    pub trait EvHandler {
        ///done event
        ///
        ///For frame callbacks, the data is the current time in milliseconds.
        ///
        ///THIS IS A DESTRUCTOR
        fn done(&mut self, sender_id: ObjectId, callback_data: u32) -> Result<(), Error>;
    }

    pub fn event<T: EvHandler>(
        state: &mut T,
        sender_id: ObjectId,
        opcode: u16,
        args: &mut Reader,
    ) -> Result<(), Error> {
        match opcode {
            0 => {
                let callback_data = args.read_u32()?;
                state.done(sender_id, callback_data)
            }
            e => unrecognized("wl_callback", e),
        }
    }
}

///the compositor singleton
pub mod wl_compositor {
    use super::*;

    ///Requests for this interface
    pub mod req {
        use super::*;

        ///create new surface
        pub fn create_surface(
            conn: &mut Connection,
            compositor: ObjectId,
            id: ObjectId,
        ) -> Result<(), Error> {
            let msg = conn.begin(compositor, 0, HEADER_LEN + ARG)?;
            msg.write_u32(id.get())?;
            conn.send()
        }
    }
}

///a shared memory pool
///
///The wl_shm_pool object encapsulates a piece of memory shared between the compositor and client.
///Through the wl_shm_pool object, the client can allocate shared memory wl_buffer objects. All
///objects created through the same pool share the same underlying mapped memory.
pub mod wl_shm_pool {
    use super::*;

    ///Requests for this interface
    pub mod req {
        use super::*;

        ///create a buffer from the pool
        ///
        ///The buffer is created offset bytes into the pool and has width and height as specified.
        ///The stride argument specifies the number of bytes from the beginning of one row to the
        ///beginning of the next.
        #[allow(clippy::too_many_arguments)]
        pub fn create_buffer(
            conn: &mut Connection,
            pool: ObjectId,
            id: ObjectId,
            offset: i32,
            width: i32,
            height: i32,
            stride: i32,
            format: u32,
        ) -> Result<(), Error> {
            let msg = conn.begin(pool, 0, HEADER_LEN + 6 * ARG)?;
            msg.write_u32(id.get())?;
            msg.write_i32(offset)?;
            msg.write_i32(width)?;
            msg.write_i32(height)?;
            msg.write_i32(stride)?;
            msg.write_u32(format)?;
            conn.send()
        }

        ///destroy the pool
        ///
        ///The mmapped memory will be released when all buffers that have been created from this
        ///pool are gone.
        ///
        ///THIS IS A DESTRUCTOR
        pub fn destroy(conn: &mut Connection, pool: ObjectId) -> Result<(), Error> {
            conn.begin(pool, 1, HEADER_LEN)?;
            conn.send()
        }
    }
}

///shared memory support
///
///A singleton global object that provides support for shared memory.
pub mod wl_shm {
    use super::*;

    pub trait EvHandler {
        ///pixel format description
        ///
        ///Informs the client about a valid pixel format that can be used for buffers.
        fn format(&mut self, format: u32) -> Result<(), Error>;
    }

    pub fn event<T: EvHandler>(
        state: &mut T,
        _sender_id: ObjectId,
        opcode: u16,
        args: &mut Reader,
    ) -> Result<(), Error> {
        match opcode {
            0 => {
                let format = args.read_u32()?;
                state.format(format)
            }
            e => unrecognized("wl_shm", e),
        }
    }

    ///pixel formats
    ///
    ///All renderers should support argb8888 and xrgb8888 but any other formats are optional.
    pub mod format {
        ///32-bit ARGB format, [31:0] A:R:G:B 8:8:8:8 little endian
        pub const ARGB8888: u32 = 0;
        ///32-bit RGB format, [31:0] x:R:G:B 8:8:8:8 little endian
        pub const XRGB8888: u32 = 1;
    }

    ///Requests for this interface
    pub mod req {
        use super::*;

        ///create a shm pool
        ///
        ///The pool can be used to create shared memory based buffer objects. The server will mmap
        ///size bytes of the passed file descriptor, to use as backing memory for the pool.
        pub fn create_pool(
            conn: &mut Connection,
            shm: ObjectId,
            id: ObjectId,
            fd: BorrowedFd,
            size: i32,
        ) -> Result<(), Error> {
            // the fd travels as ancillary data, it takes no room in the message
            let msg = conn.begin(shm, 0, HEADER_LEN + ARG + ARG)?;
            msg.write_u32(id.get())?;
            msg.write_i32(size)?;
            conn.send_with_fd(fd)
        }
    }
}

///content for a wl_surface
pub mod wl_buffer {
    use super::*;

    pub trait EvHandler {
        ///compositor releases buffer
        ///
        ///Sent when this wl_buffer is no longer used by the compositor.
        fn release(&mut self, sender_id: ObjectId) -> Result<(), Error>;
    }

    pub fn event<T: EvHandler>(
        state: &mut T,
        sender_id: ObjectId,
        opcode: u16,
        _args: &mut Reader,
    ) -> Result<(), Error> {
        match opcode {
            0 => state.release(sender_id),
            e => unrecognized("wl_buffer", e),
        }
    }

    ///Requests for this interface
    pub mod req {
        use super::*;

        ///destroy a buffer
        ///
        ///THIS IS A DESTRUCTOR
        pub fn destroy(conn: &mut Connection, buffer: ObjectId) -> Result<(), Error> {
            conn.begin(buffer, 0, HEADER_LEN)?;
            conn.send()
        }
    }
}

///an onscreen surface
pub mod wl_surface {
    use super::*;

    pub trait EvHandler {
        ///surface enters an output
        fn enter(&mut self, sender_id: ObjectId, output: u32) -> Result<(), Error>;
        ///surface leaves an output
        fn leave(&mut self, sender_id: ObjectId, output: u32) -> Result<(), Error>;
    }

    pub fn event<T: EvHandler>(
        state: &mut T,
        sender_id: ObjectId,
        opcode: u16,
        args: &mut Reader,
    ) -> Result<(), Error> {
        match opcode {
            0 => {
                let output = args.read_u32()?;
                state.enter(sender_id, output)
            }
            1 => {
                let output = args.read_u32()?;
                state.leave(sender_id, output)
            }
            e => unrecognized("wl_surface", e),
        }
    }

    ///Requests for this interface
    pub mod req {
        use super::*;

        ///delete surface
        ///
        ///THIS IS A DESTRUCTOR
        pub fn destroy(conn: &mut Connection, surface: ObjectId) -> Result<(), Error> {
            conn.begin(surface, 0, HEADER_LEN)?;
            conn.send()
        }

        ///set the surface contents
        ///
        ///Set a buffer as the content of this surface. A null buffer removes the content.
        pub fn attach(
            conn: &mut Connection,
            surface: ObjectId,
            buffer: Option<ObjectId>,
            x: i32,
            y: i32,
        ) -> Result<(), Error> {
            let msg = conn.begin(surface, 1, HEADER_LEN + 3 * ARG)?;
            msg.write_u32(buffer.map_or(0, |b| b.get()))?;
            msg.write_i32(x)?;
            msg.write_i32(y)?;
            conn.send()
        }

        ///mark part of the surface damaged
        ///
        ///Coordinates are in surface-local coordinates.
        pub fn damage(
            conn: &mut Connection,
            surface: ObjectId,
            x: i32,
            y: i32,
            width: i32,
            height: i32,
        ) -> Result<(), Error> {
            let msg = conn.begin(surface, 2, HEADER_LEN + 4 * ARG)?;
            msg.write_i32(x)?;
            msg.write_i32(y)?;
            msg.write_i32(width)?;
            msg.write_i32(height)?;
            conn.send()
        }

        ///request a frame throttling hint
        ///
        ///The callback's done event fires when it is a good time to start drawing a new frame.
        ///The request only takes effect on the next commit.
        pub fn frame(
            conn: &mut Connection,
            surface: ObjectId,
            callback: ObjectId,
        ) -> Result<(), Error> {
            let msg = conn.begin(surface, 3, HEADER_LEN + ARG)?;
            msg.write_u32(callback.get())?;
            conn.send()
        }

        ///commit pending surface state
        pub fn commit(conn: &mut Connection, surface: ObjectId) -> Result<(), Error> {
            conn.begin(surface, 6, HEADER_LEN)?;
            conn.send()
        }
    }
}

///compositor output region
///
///An output describes part of the compositor geometry. Typically it corresponds to a monitor.
pub mod wl_output {
    use super::*;

    pub trait EvHandler {
        ///advertise available modes for the output
        fn mode(
            &mut self,
            sender_id: ObjectId,
            flags: u32,
            width: i32,
            height: i32,
            refresh: i32,
        ) -> Result<(), Error>;
        ///output scaling properties
        fn scale(&mut self, sender_id: ObjectId, factor: i32) -> Result<(), Error>;
        ///name of this output
        fn name(&mut self, sender_id: ObjectId, name: &str) -> Result<(), Error>;
    }

    pub fn event<T: EvHandler>(
        state: &mut T,
        sender_id: ObjectId,
        opcode: u16,
        args: &mut Reader,
    ) -> Result<(), Error> {
        match opcode {
            1 => {
                let flags = args.read_u32()?;
                let width = args.read_i32()?;
                let height = args.read_i32()?;
                let refresh = args.read_i32()?;
                state.mode(sender_id, flags, width, height, refresh)
            }
            3 => {
                let factor = args.read_i32()?;
                state.scale(sender_id, factor)
            }
            4 => {
                let name = args.read_string()?;
                state.name(sender_id, name)
            }
            // geometry, done and description
            e => unrecognized("wl_output", e),
        }
    }
}

///create desktop-style surfaces
pub mod xdg_wm_base {
    use super::*;

    pub trait EvHandler {
        ///check if the client is alive
        ///
        ///The client must respond with a pong request, or it may be deemed unresponsive.
        fn ping(&mut self, serial: u32) -> Result<(), Error>;
    }

    pub fn event<T: EvHandler>(
        state: &mut T,
        _sender_id: ObjectId,
        opcode: u16,
        args: &mut Reader,
    ) -> Result<(), Error> {
        match opcode {
            0 => {
                let serial = args.read_u32()?;
                state.ping(serial)
            }
            e => unrecognized("xdg_wm_base", e),
        }
    }

    ///Requests for this interface
    pub mod req {
        use super::*;

        ///create a shell surface from a surface
        pub fn get_xdg_surface(
            conn: &mut Connection,
            wm_base: ObjectId,
            id: ObjectId,
            surface: ObjectId,
        ) -> Result<(), Error> {
            let msg = conn.begin(wm_base, 2, HEADER_LEN + ARG + ARG)?;
            msg.write_u32(id.get())?;
            msg.write_u32(surface.get())?;
            conn.send()
        }

        ///respond to a ping event
        pub fn pong(conn: &mut Connection, wm_base: ObjectId, serial: u32) -> Result<(), Error> {
            let msg = conn.begin(wm_base, 3, HEADER_LEN + ARG)?;
            msg.write_u32(serial)?;
            conn.send()
        }
    }
}

///desktop user interface surface base interface
pub mod xdg_surface {
    use super::*;

    pub trait EvHandler {
        ///suggest a surface change
        ///
        ///Marks the end of a configure sequence. The client must ack it before its next commit.
        fn configure(&mut self, serial: u32) -> Result<(), Error>;
    }

    pub fn event<T: EvHandler>(
        state: &mut T,
        _sender_id: ObjectId,
        opcode: u16,
        args: &mut Reader,
    ) -> Result<(), Error> {
        match opcode {
            0 => {
                let serial = args.read_u32()?;
                state.configure(serial)
            }
            e => unrecognized("xdg_surface", e),
        }
    }

    ///Requests for this interface
    pub mod req {
        use super::*;

        ///destroy the xdg_surface
        ///
        ///THIS IS A DESTRUCTOR
        pub fn destroy(conn: &mut Connection, xdg_surface: ObjectId) -> Result<(), Error> {
            conn.begin(xdg_surface, 0, HEADER_LEN)?;
            conn.send()
        }

        ///assign the xdg_toplevel surface role
        pub fn get_toplevel(
            conn: &mut Connection,
            xdg_surface: ObjectId,
            id: ObjectId,
        ) -> Result<(), Error> {
            let msg = conn.begin(xdg_surface, 1, HEADER_LEN + ARG)?;
            msg.write_u32(id.get())?;
            conn.send()
        }

        ///ack a configure event
        pub fn ack_configure(
            conn: &mut Connection,
            xdg_surface: ObjectId,
            serial: u32,
        ) -> Result<(), Error> {
            let msg = conn.begin(xdg_surface, 4, HEADER_LEN + ARG)?;
            msg.write_u32(serial)?;
            conn.send()
        }
    }
}

///toplevel surface
pub mod xdg_toplevel {
    use super::*;

    pub trait EvHandler {
        ///suggest a surface change
        ///
        ///A width or height of zero means the client should decide its own window dimension.
        ///States are 32 bit values, packed in an array.
        fn configure(&mut self, width: i32, height: i32, states: &[u8]) -> Result<(), Error>;
        ///surface wants to be closed
        fn close(&mut self) -> Result<(), Error>;
        ///recommended window geometry bounds
        fn configure_bounds(&mut self, width: i32, height: i32) -> Result<(), Error>;
        ///compositor capabilities
        fn wm_capabilities(&mut self, capabilities: &[u8]) -> Result<(), Error>;
    }

    pub fn event<T: EvHandler>(
        state: &mut T,
        _sender_id: ObjectId,
        opcode: u16,
        args: &mut Reader,
    ) -> Result<(), Error> {
        match opcode {
            0 => {
                let width = args.read_i32()?;
                let height = args.read_i32()?;
                let states = args.read_array()?;
                state.configure(width, height, states)
            }
            1 => state.close(),
            2 => {
                let width = args.read_i32()?;
                let height = args.read_i32()?;
                state.configure_bounds(width, height)
            }
            3 => {
                let capabilities = args.read_array()?;
                state.wm_capabilities(capabilities)
            }
            e => unrecognized("xdg_toplevel", e),
        }
    }

    ///Requests for this interface
    pub mod req {
        use super::*;

        ///destroy the xdg_toplevel
        ///
        ///THIS IS A DESTRUCTOR
        pub fn destroy(conn: &mut Connection, toplevel: ObjectId) -> Result<(), Error> {
            conn.begin(toplevel, 0, HEADER_LEN)?;
            conn.send()
        }

        ///set surface title
        pub fn set_title(
            conn: &mut Connection,
            toplevel: ObjectId,
            title: &str,
        ) -> Result<(), Error> {
            let msg = conn.begin(toplevel, 2, HEADER_LEN + str_len(title))?;
            msg.write_str(title)?;
            conn.send()
        }

        ///set application ID
        ///
        ///Identifies the general class of applications this surface belongs to.
        pub fn set_app_id(
            conn: &mut Connection,
            toplevel: ObjectId,
            app_id: &str,
        ) -> Result<(), Error> {
            let msg = conn.begin(toplevel, 3, HEADER_LEN + str_len(app_id))?;
            msg.write_str(app_id)?;
            conn.send()
        }
    }
}
