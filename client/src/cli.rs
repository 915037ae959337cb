use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, name = "rawland")]
///Opens a single window on your wayland compositor, without any wayland library
///
///The window slowly fades from black to white and back, one shade per frame, until the compositor
///closes it. We connect to $WAYLAND_DISPLAY inside $XDG_RUNTIME_DIR, falling back to wayland-0.
pub struct Rawland {
    ///Width of the window until the compositor suggests another one
    #[arg(long, env = "RAWLAND_WIDTH", default_value_t = 640,
        value_parser = clap::value_parser!(u32).range(1..=16384))]
    pub width: u32,

    ///Height of the window until the compositor suggests another one
    #[arg(long, env = "RAWLAND_HEIGHT", default_value_t = 480,
        value_parser = clap::value_parser!(u32).range(1..=16384))]
    pub height: u32,

    ///Window title, as shown by the compositor
    #[arg(short, long, default_value = "rawland")]
    pub title: String,

    ///Application id the compositor may use to group or match windows
    #[arg(long, default_value = "rawland")]
    pub app_id: String,

    ///Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}
