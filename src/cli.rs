//! Command-line interface.

use crate::config::{Config, ConfigError};
use crate::transform::Rotation;
use clap::Parser;
use std::path::PathBuf;

/// Serve a camera over HTTP as an MJPEG stream and JPEG snapshots.
///
/// Flags override values from `--config`, which override the defaults.
#[derive(Parser, Debug, Default)]
#[command(author, version, about)]
pub struct Cli {
    /// Host name or IP address to listen on [default: 0.0.0.0]
    #[arg(long)]
    pub listen: Option<String>,

    /// Port number for the server [default: 8080]
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Camera device index [default: 0]
    #[arg(short = 'd', long)]
    pub device: Option<u32>,

    /// Flip the captured video horizontally
    #[arg(long = "flip_horizontal", overrides_with = "no_flip_horizontal")]
    pub flip_horizontal: bool,

    /// Do not flip horizontally, even if the config file asks to
    #[arg(long = "no_flip_horizontal", overrides_with = "flip_horizontal")]
    pub no_flip_horizontal: bool,

    /// Flip the captured video vertically
    #[arg(long = "flip_vertical", overrides_with = "no_flip_vertical")]
    pub flip_vertical: bool,

    /// Do not flip vertically, even if the config file asks to
    #[arg(long = "no_flip_vertical", overrides_with = "flip_vertical")]
    pub no_flip_vertical: bool,

    /// Rotate the captured image: 0, 90, 180, 270 or -90 [default: 0]
    #[arg(short = 'r', long, allow_negative_numbers = true)]
    pub rotate: Option<Rotation>,

    /// JPEG quality, 0-100 [default: 90]
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub quality: Option<u8>,

    /// Target stream framerate, 0 for unlimited [default: 60]
    #[arg(long)]
    pub framerate: Option<u32>,

    /// Fixed focus value, -1 for autofocus [default: -1]
    #[arg(long = "manual_focus", allow_negative_numbers = true)]
    pub manual_focus: Option<i32>,

    /// TOML configuration file
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Builds the process configuration from defaults, the config file and
    /// these flags.
    pub fn resolve(&self) -> Result<Config, ConfigError> {
        let base = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        let config = self.apply(base);
        config.validate()?;
        Ok(config)
    }

    fn apply(&self, mut config: Config) -> Config {
        if let Some(listen) = &self.listen {
            config.server.listen = listen.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(device) = self.device {
            config.capture.device = device;
        }
        if let Some(focus) = self.manual_focus {
            config.capture.manual_focus = focus;
        }

        let stream = &mut config.stream;
        if let Some(flip) = switch(self.flip_horizontal, self.no_flip_horizontal) {
            stream.flip_horizontal = flip;
        }
        if let Some(flip) = switch(self.flip_vertical, self.no_flip_vertical) {
            stream.flip_vertical = flip;
        }
        if let Some(rotate) = self.rotate {
            stream.rotate = rotate;
        }
        if let Some(quality) = self.quality {
            stream.quality = quality;
        }
        if let Some(framerate) = self.framerate {
            stream.framerate = framerate;
        }
        config
    }
}

/// Resolves a `--flag` / `--no_flag` pair; `None` keeps the configured value.
fn switch(on: bool, off: bool) -> Option<bool> {
    if on {
        Some(true)
    } else if off {
        Some(false)
    } else {
        None
    }
}
