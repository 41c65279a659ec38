use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use tracing::{debug, warn};

use citygrid_shared::coords::CellPos;
use citygrid_shared::heightmap::{BiomeSource, HeightmapProvider};
use citygrid_shared::planner::{CellPlan, CellPlanner};

use crate::events::{EventSender, PlanEvent};

pub struct JobSystem {
    pool: ThreadPool,
}

impl JobSystem {
    pub fn new(num_threads: Option<usize>) -> Result<Self, ThreadPoolBuildError> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("citygrid-worker-{i}"));
        if let Some(count) = num_threads {
            builder = builder.num_threads(count);
        }

        let pool = builder.build()?;
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn plan_cells<T>(&self, planner: &CellPlanner<'_, T>, cells: &[CellPos]) -> Vec<CellPlan>
    where
        T: HeightmapProvider + BiomeSource + Sync + ?Sized,
    {
        debug!("planning {} cells on {} threads", cells.len(), self.threads());
        self.pool
            .install(|| cells.par_iter().map(|cell| planner.plan_cell(*cell)).collect())
    }

    pub fn plan_cells_with_events<T>(
        &self,
        planner: &CellPlanner<'_, T>,
        cells: &[CellPos],
        events: &EventSender<PlanEvent>,
    ) -> Vec<CellPlan>
    where
        T: HeightmapProvider + BiomeSource + Sync + ?Sized,
    {
        self.pool.install(|| {
            cells
                .par_iter()
                .map_with(events.clone(), |tx, cell| {
                    let plan = planner.plan_cell(*cell);
                    let event = PlanEvent::CellPlanned {
                        cell: plan.cell,
                        kind: plan.kind,
                        structure_parts: plan.structures.len(),
                        moved_blocks: plan.moved_blocks(),
                    };
                    if tx.send(event).is_err() {
                        warn!("plan event receiver dropped");
                    }
                    plan
                })
                .collect()
        })
    }
}
