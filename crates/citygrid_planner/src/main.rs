mod map;

use std::env;
use std::error::Error;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use citygrid_core::cache::HeightCache;
use citygrid_core::events::{channel, PlanEvent};
use citygrid_core::jobs::JobSystem;
use citygrid_persist::snapshot::LayoutSnapshot;
use citygrid_shared::city::CellKind;
use citygrid_shared::config::{CityGenConfig, ConfigError, SeedValue};
use citygrid_shared::coords::CellPos;
use citygrid_shared::planner::CellPlanner;
use citygrid_shared::terrain::NoiseTerrain;

const USAGE: &str = "Usage: citygrid_planner [--config <path>] [--seed <value>] [--center <x,z>] \
[--radius <cells>] [--out <path>] [--threads <n>]";

struct PlannerArgs {
    config_path: PathBuf,
    seed: Option<SeedValue>,
    center: CellPos,
    radius: i32,
    out: Option<PathBuf>,
    threads: Option<usize>,
}

fn main() {
    let _ = tracing_subscriber::fmt().with_target(false).try_init();

    let mut parsed = PlannerArgs {
        config_path: PathBuf::from("citygrid.toml"),
        seed: None,
        center: CellPos::new(0, 0),
        radius: 12,
        out: None,
        threads: None,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value_for = |flag: &str| {
            let Some(value) = args.next() else {
                eprintln!("{flag} expects an argument");
                std::process::exit(2);
            };
            value
        };
        match arg.as_str() {
            "--config" => parsed.config_path = PathBuf::from(value_for("--config")),
            "--seed" => parsed.seed = Some(SeedValue::Text(value_for("--seed"))),
            "--center" => {
                let value = value_for("--center");
                let Some(center) = parse_center(&value) else {
                    eprintln!("invalid center '{value}'; expected <x,z>");
                    std::process::exit(2);
                };
                parsed.center = center;
            }
            "--radius" => {
                let value = value_for("--radius");
                match value.parse::<i32>() {
                    Ok(radius) if radius >= 0 => parsed.radius = radius,
                    _ => {
                        eprintln!("invalid radius '{value}'");
                        std::process::exit(2);
                    }
                }
            }
            "--out" => parsed.out = Some(PathBuf::from(value_for("--out"))),
            "--threads" => {
                let value = value_for("--threads");
                match value.parse::<usize>() {
                    Ok(threads) if threads > 0 => parsed.threads = Some(threads),
                    _ => {
                        eprintln!("invalid thread count '{value}'");
                        std::process::exit(2);
                    }
                }
            }
            "--help" | "-h" => {
                println!("{USAGE}");
                return;
            }
            other => {
                eprintln!("unknown argument: {other}");
                eprintln!("{USAGE}");
                std::process::exit(2);
            }
        }
    }

    if let Err(err) = run(parsed) {
        eprintln!("citygrid_planner error: {err}");
        std::process::exit(1);
    }
}

fn parse_center(value: &str) -> Option<CellPos> {
    let (x, z) = value.split_once(',')?;
    Some(CellPos::new(x.trim().parse().ok()?, z.trim().parse().ok()?))
}

fn load_config(path: &Path) -> Result<CityGenConfig, ConfigError> {
    match CityGenConfig::load(path) {
        Ok(config) => Ok(config),
        Err(ConfigError::Read { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            warn!("No config at {}, using defaults", path.display());
            Ok(CityGenConfig::default())
        }
        Err(err) => Err(err),
    }
}

fn run(args: PlannerArgs) -> Result<(), Box<dyn Error>> {
    let mut config = load_config(&args.config_path)?;
    if let Some(seed) = args.seed {
        config.world_seed = seed;
    }

    let bounds = config.vertical_bounds();
    let settings = config.into_settings()?;
    info!(
        "Planning {} selector(s), {} structure(s), seed {}",
        settings.selectors.len(),
        settings.catalog.len(),
        settings.world_seed
    );

    let terrain = HeightCache::new(NoiseTerrain::new(settings.world_seed as u64, bounds));
    let planner = CellPlanner::new(&settings, &terrain);
    let jobs = JobSystem::new(args.threads)?;

    let cells = map::window(args.center, args.radius);
    let (tx, rx) = channel();
    let plans = jobs.plan_cells_with_events(&planner, &cells, &tx);

    let mut city_cells = 0usize;
    let mut structure_parts = 0usize;
    let mut moved = 0u64;
    for event in rx.drain() {
        let PlanEvent::CellPlanned {
            kind,
            structure_parts: parts,
            moved_blocks,
            ..
        } = event;
        if kind != CellKind::Wild {
            city_cells += 1;
        }
        structure_parts += parts;
        moved += moved_blocks;
    }

    let stats = terrain.stats();
    info!(
        "Planned {} cells: {} flat, {} structure part(s), {} block(s) moved",
        plans.len(),
        city_cells,
        structure_parts,
        moved
    );
    info!(
        "Height cache: {} entries, {} hits, {} misses",
        stats.entries, stats.hits, stats.misses
    );

    print!("{}", map::render(&plans, args.center, args.radius));

    if let Some(out) = args.out {
        let snapshot = LayoutSnapshot::new(
            settings.world_seed,
            settings.city.region_size.get() as u32,
            bounds,
            plans,
        );
        snapshot.save(&out)?;
    }

    Ok(())
}
