use citygrid_shared::city::CellKind;
use citygrid_shared::coords::CellPos;
use citygrid_shared::planner::CellPlan;

pub fn window(center: CellPos, radius: i32) -> Vec<CellPos> {
    let radius = radius.max(0);
    (-radius..=radius)
        .flat_map(|dz| (-radius..=radius).map(move |dx| center + CellPos::new(dx, dz)))
        .collect()
}

fn glyph(plan: &CellPlan) -> char {
    match plan.structures.first() {
        Some(placement) if placement.part.is_anchor() => '@',
        Some(_) => '#',
        None => match plan.kind {
            CellKind::Wild => '.',
            CellKind::Street => '+',
            CellKind::Building => 'B',
        },
    }
}

pub fn render(plans: &[CellPlan], center: CellPos, radius: i32) -> String {
    let radius = radius.max(0);
    let side = (2 * radius + 1) as usize;
    let mut out = String::with_capacity(side * (side + 1));
    for dz in -radius..=radius {
        for dx in -radius..=radius {
            let pos = center + CellPos::new(dx, dz);
            let ch = plans
                .iter()
                .find(|plan| plan.cell == pos)
                .map_or(' ', glyph);
            out.push(ch);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use citygrid_shared::anchor::FootprintPart;
    use citygrid_shared::city::CellKind;
    use citygrid_shared::coords::CellPos;
    use citygrid_shared::planner::{CellPlan, StructurePlacement};

    use super::{render, window};

    fn plan(cell: CellPos, kind: CellKind) -> CellPlan {
        CellPlan {
            cell,
            kind,
            ground_level: None,
            structures: Vec::new(),
            targets: None,
            columns: Vec::new(),
        }
    }

    #[test]
    fn window_is_square_and_centered() {
        let cells = window(CellPos::new(10, -3), 2);
        assert_eq!(cells.len(), 25);
        assert_eq!(cells[0], CellPos::new(8, -5));
        assert_eq!(cells[12], CellPos::new(10, -3));
        assert_eq!(window(CellPos::new(0, 0), -1), vec![CellPos::new(0, 0)]);
    }

    #[test]
    fn map_marks_kinds_and_structures() {
        let center = CellPos::new(0, 0);
        let mut plans: Vec<CellPlan> = window(center, 1)
            .into_iter()
            .map(|cell| plan(cell, CellKind::Wild))
            .collect();
        plans[1].kind = CellKind::Street;
        plans[4].kind = CellKind::Building;
        plans[4].structures.push(StructurePlacement {
            selector: "downtown".to_string(),
            structure: "hall".to_string(),
            anchor: center,
            part: FootprintPart {
                rel_x: 0,
                rel_z: 0,
                width: 2,
                depth: 1,
            },
        });
        plans[5].kind = CellKind::Building;
        plans.pop();

        assert_eq!(render(&plans, center, 1), ".+.\n.@B\n.. \n");
    }
}
