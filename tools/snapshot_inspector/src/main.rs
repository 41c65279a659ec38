use std::env;
use std::path::Path;

use citygrid_persist::snapshot::LayoutSnapshot;
use citygrid_shared::city::CellKind;

fn main() {
    let Some(path) = env::args().nth(1) else {
        eprintln!("Usage: snapshot_inspector <path/to/layout.cgls>");
        std::process::exit(2);
    };

    if let Err(err) = run(Path::new(&path)) {
        eprintln!("snapshot_inspector error: {err}");
        std::process::exit(1);
    }
}

fn run(path: &Path) -> Result<(), String> {
    let snapshot = LayoutSnapshot::load(path)
        .map_err(|err| format!("failed to open {}: {err}", path.display()))?;

    println!("Snapshot: {}", path.display());
    println!("Magic: {:?}", LayoutSnapshot::MAGIC);
    println!("Format version: {}", snapshot.format_version);
    println!("World seed: {}", snapshot.world_seed);
    println!("City region size: {}", snapshot.city_region_size);
    println!(
        "Vertical bounds: {}..{}",
        snapshot.bounds.min, snapshot.bounds.max_exclusive
    );
    println!("Cell count: {}", snapshot.cells.len());

    let count = |kind: CellKind| snapshot.cells.iter().filter(|plan| plan.kind == kind).count();
    println!(
        "  wild: {}, street: {}, building: {}",
        count(CellKind::Wild),
        count(CellKind::Street),
        count(CellKind::Building)
    );

    for plan in snapshot.cells.iter().filter(|plan| plan.kind != CellKind::Wild) {
        let level = plan
            .ground_level
            .map_or_else(|| "-".to_string(), |level| level.to_string());
        let range = plan
            .targets
            .as_ref()
            .map_or_else(|| "-".to_string(), |t| format!("{}..={}", t.min(), t.max()));
        print!(
            "  cell @ ({}, {}) {:?} level {level} targets {range} moved {}",
            plan.cell.x,
            plan.cell.z,
            plan.kind,
            plan.moved_blocks()
        );
        for placement in &plan.structures {
            print!(
                " [{}:{} part ({}, {}) of {}x{}]",
                placement.selector,
                placement.structure,
                placement.part.rel_x,
                placement.part.rel_z,
                placement.part.width,
                placement.part.depth
            );
        }
        println!();
    }

    Ok(())
}
