//! Headless `vecmap` driver: streams tiles for a simulated camera and logs
//! each frame's draw list.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, info};
use vecmap_app::{AppError, FrameClock, MapView, PlatformDirs};
use vecmap_cache::DirectorySource;
use vecmap_config::{CliArgs, Config};
use vecmap_lod::{ScreenEdges, clamp_scale, layer_for_scale};

const FRAME_INTERVAL: Duration = Duration::from_millis(16);

fn main() -> Result<(), AppError> {
    let args = CliArgs::parse();

    let dirs = PlatformDirs::resolve()?.with_config_dir(args.config.as_deref());
    dirs.create_dirs()?;
    let mut config = Config::load_or_create(&dirs.config_dir)?;
    config.apply_cli_overrides(&args);

    vecmap_log::init_logging(Some(&dirs.log_dir), cfg!(debug_assertions), Some(&config));
    info!("Config: {}", dirs.config_dir.display());
    info!("Tiles:  {}", config.assets.tile_dir.display());

    let source = Arc::new(DirectorySource::new(config.assets.tile_dir.clone()));
    let mut view = MapView::new(source, &config)?;
    info!("Inventoried {} tiles", view.inventory_size());

    let center = [config.view.center_x, config.view.center_y];
    let aspect = config.view.aspect();
    let mut scale = clamp_scale(config.view.scale_factor);
    let mut clock = FrameClock::new(config.lod.max_frame_delta_secs);

    for frame in 0..args.frames {
        let elapsed = clock.tick();
        scale = clamp_scale(scale * args.zoom_rate.powf(elapsed));
        let edges = ScreenEdges::from_camera(center, scale, aspect);
        let draw = view.get_draw_order(edges, scale, elapsed);

        // Drawn tiles are resident, so these lookups never decode.
        let triangles: usize = draw
            .iter()
            .filter_map(|item| view.tile(item.position))
            .map(|tile| tile.triangle_count())
            .sum();
        let list = draw
            .iter()
            .map(|item| format!("{}@{:.2}", item.position, item.blend))
            .collect::<Vec<_>>()
            .join(" ");
        debug!(
            frame,
            scale,
            layer = layer_for_scale(scale),
            triangles,
            pending = view.pending_loads(),
            "Draw list: {list}"
        );

        std::thread::sleep(FRAME_INTERVAL);
    }

    let stats = view.stats();
    info!(
        "Done after {} frames ({} paused): {} decoded, {} failed, {} evicted, {} KiB resident, {} LOD nodes",
        clock.frame_count(),
        clock.skipped(),
        stats.decoded,
        stats.failed,
        stats.evicted,
        stats.resident_bytes / 1024,
        view.node_count()
    );
    view.shutdown();
    Ok(())
}
