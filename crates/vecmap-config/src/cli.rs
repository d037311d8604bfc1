//! Command-line arguments for the `vecmap` driver.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Headless vector map viewer.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "vecmap", about = "Streams and LOD-blends vector map tiles")]
pub struct CliArgs {
    /// Directory holding `tri_*.tri` tile files.
    #[arg(long)]
    pub tiles: Option<PathBuf>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log filter (error, warn, info, debug, trace, or a RUST_LOG directive).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Initial zoom scale factor.
    #[arg(long)]
    pub scale: Option<f32>,

    /// Initial camera center x in offset map units.
    #[arg(long, allow_negative_numbers = true)]
    pub center_x: Option<f32>,

    /// Initial camera center y in offset map units.
    #[arg(long, allow_negative_numbers = true)]
    pub center_y: Option<f32>,

    /// Number of frames to simulate.
    #[arg(long, default_value_t = 120)]
    pub frames: u32,

    /// Zoom multiplier applied per simulated second.
    #[arg(long, default_value_t = 1.0)]
    pub zoom_rate: f32,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref dir) = args.tiles {
            self.assets.tile_dir = dir.clone();
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
        if let Some(scale) = args.scale {
            self.view.scale_factor = scale;
        }
        if let Some(x) = args.center_x {
            self.view.center_x = x;
        }
        if let Some(y) = args.center_y {
            self.view.center_y = y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs::try_parse_from([
            "vecmap",
            "--tiles",
            "/srv/tiles",
            "--scale",
            "900",
            "--center-y",
            "-12000",
        ])
        .unwrap();
        config.apply_cli_overrides(&args);

        assert_eq!(config.assets.tile_dir, PathBuf::from("/srv/tiles"));
        assert_eq!(config.view.scale_factor, 900.0);
        assert_eq!(config.view.center_y, -12000.0);
        // Non-overridden fields retain defaults
        assert_eq!(config.view.center_x, 0.0);
        assert_eq!(config.debug.log_level, "info");
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        let args = CliArgs::try_parse_from(["vecmap"]).unwrap();
        config.apply_cli_overrides(&args);
        assert_eq!(config, original);
        assert_eq!(args.frames, 120);
        assert_eq!(args.zoom_rate, 1.0);
    }
}
