//! A wayland client that speaks the wire protocol by hand
//!
//! There is no libwayland and no generated bindings here. [`wayland`] has the framing, the socket
//! and one module per interface we use. [`window`] puts a single xdg toplevel on screen and keeps
//! feeding it frames until the compositor closes it.

pub mod error;
pub mod wayland;
pub mod window;

pub use error::Error;
pub use window::{Stage, Window, WindowConfig};

use wayland::connection::Connection;

/// Connects to the compositor named by the environment and starts a window session
///
/// Nothing shows up until the returned [`Window`] is [run](Window::run).
pub fn create_a_window(config: WindowConfig) -> Result<Window, Error> {
    let conn = Connection::connect_to_env()?;
    Window::new(conn, config)
}

/// Destroys the window's surface objects and closes the connection
pub fn destroy_a_window(window: Window) {
    window.destroy();
}
