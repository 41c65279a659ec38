use tracing::trace;

type Strategy<'a, C, T> = Box<dyn Fn(&C) -> Option<T> + 'a>;

pub struct FallbackChain<'a, C: ?Sized, T> {
    label: &'static str,
    tiers: Vec<(&'static str, Strategy<'a, C, T>)>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Resolved<T> {
    pub value: T,
    pub tier: &'static str,
}

impl<'a, C: ?Sized, T> FallbackChain<'a, C, T> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            tiers: Vec::new(),
        }
    }

    pub fn then<F>(mut self, tier: &'static str, strategy: F) -> Self
    where
        F: Fn(&C) -> Option<T> + 'a,
    {
        self.tiers.push((tier, Box::new(strategy)));
        self
    }

    pub fn tier_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tiers.iter().map(|(name, _)| *name)
    }

    pub fn resolve(&self, ctx: &C) -> Option<Resolved<T>> {
        for (tier, strategy) in &self.tiers {
            if let Some(value) = strategy(ctx) {
                trace!("{} resolved by tier '{}'", self.label, tier);
                return Some(Resolved { value, tier });
            }
        }
        trace!("{} exhausted {} tiers", self.label, self.tiers.len());
        None
    }

    pub fn resolve_or(&self, ctx: &C, default: T) -> T {
        self.resolve(ctx).map_or(default, |resolved| resolved.value)
    }
}
