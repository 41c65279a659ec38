use serde::{Deserialize, Serialize};

use crate::heightmap::VerticalBounds;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedLimits {
    pub max_raise: u32,
    pub max_lower: u32,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbedAction {
    #[default]
    None,
    Clear {
        from: i32,
        to: i32,
    },
    Fill {
        from: i32,
        to: i32,
    },
}

impl EmbedAction {
    pub fn block_count(&self) -> u32 {
        match *self {
            EmbedAction::None => 0,
            EmbedAction::Clear { from, to } | EmbedAction::Fill { from, to } => {
                (to - from + 1).max(0) as u32
            }
        }
    }

    pub fn resulting_height(&self, natural: i32) -> i32 {
        match *self {
            EmbedAction::None => natural,
            EmbedAction::Fill { to, .. } => to,
            EmbedAction::Clear { from, to } if to >= natural => from - 1,
            EmbedAction::Clear { .. } => natural,
        }
    }
}

pub fn embed_column(
    natural: i32,
    target: i32,
    limits: EmbedLimits,
    bounds: VerticalBounds,
) -> EmbedAction {
    let natural = bounds.clamp(natural);
    let target = bounds.clamp(target);

    if natural > target {
        let to = natural.min(target.saturating_add(clamp_limit(limits.max_lower)));
        if to <= target {
            return EmbedAction::None;
        }
        EmbedAction::Clear {
            from: target + 1,
            to,
        }
    } else if natural < target {
        let to = target.min(natural.saturating_add(clamp_limit(limits.max_raise)));
        if to <= natural {
            return EmbedAction::None;
        }
        EmbedAction::Fill {
            from: natural + 1,
            to,
        }
    } else {
        EmbedAction::None
    }
}

fn clamp_limit(limit: u32) -> i32 {
    i32::try_from(limit).unwrap_or(i32::MAX)
}

pub trait ColumnSink {
    type Material: Copy;

    fn is_solid(&self, y: i32) -> bool;

    fn place(&mut self, y: i32, material: Self::Material);

    fn clear(&mut self, y: i32);
}

pub fn apply<S: ColumnSink>(action: EmbedAction, sink: &mut S, fill: S::Material) {
    match action {
        EmbedAction::None => {}
        EmbedAction::Clear { from, to } => {
            for y in from..=to {
                sink.clear(y);
            }
        }
        EmbedAction::Fill { from, to } => {
            for y in from..=to {
                sink.place(y, fill);
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SolidEmbed {
    pub action: EmbedAction,
    pub patched: Option<i32>,
}

/// Like [`embed_column`] followed by [`apply`], but additionally guarantees a
/// walkable block at the pad height the bounded pass reached. When the raise
/// cap stops a fill short of the target, the pad is the top of the fill; it is
/// never placed above it.
pub fn embed_column_solid<S: ColumnSink>(
    natural: i32,
    target: i32,
    limits: EmbedLimits,
    bounds: VerticalBounds,
    sink: &mut S,
    fill: S::Material,
) -> SolidEmbed {
    let action = embed_column(natural, target, limits, bounds);
    apply(action, sink, fill);

    let natural = bounds.clamp(natural);
    let target = bounds.clamp(target);
    let pad = match action {
        EmbedAction::Fill { to, .. } => to,
        EmbedAction::None if natural < target => natural,
        EmbedAction::None | EmbedAction::Clear { .. } => target,
    };

    let patched = if sink.is_solid(pad) {
        None
    } else {
        sink.place(pad, fill);
        Some(pad)
    };

    SolidEmbed { action, patched }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnBuffer<M> {
    bounds: VerticalBounds,
    blocks: Vec<Option<M>>,
}

impl<M: Copy> ColumnBuffer<M> {
    pub fn new(bounds: VerticalBounds) -> Self {
        let len = (bounds.max_exclusive - bounds.min).max(0) as usize;
        Self {
            bounds,
            blocks: vec![None; len],
        }
    }

    pub fn with_surface(bounds: VerticalBounds, surface: i32, material: M) -> Self {
        let mut column = Self::new(bounds);
        for y in bounds.min..=bounds.clamp(surface) {
            column.place(y, material);
        }
        column
    }

    pub fn get(&self, y: i32) -> Option<M> {
        self.index(y).and_then(|index| self.blocks[index])
    }

    pub fn top(&self) -> Option<i32> {
        self.blocks
            .iter()
            .rposition(Option::is_some)
            .map(|index| self.bounds.min + index as i32)
    }

    fn index(&self, y: i32) -> Option<usize> {
        self.bounds
            .contains(y)
            .then(|| (y - self.bounds.min) as usize)
    }
}

impl<M: Copy> ColumnSink for ColumnBuffer<M> {
    type Material = M;

    fn is_solid(&self, y: i32) -> bool {
        self.get(y).is_some()
    }

    fn place(&mut self, y: i32, material: M) {
        if let Some(index) = self.index(y) {
            self.blocks[index] = Some(material);
        }
    }

    fn clear(&mut self, y: i32) {
        if let Some(index) = self.index(y) {
            self.blocks[index] = None;
        }
    }
}
