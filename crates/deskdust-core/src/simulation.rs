//! Host-facing simulation surface and the kind registry

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::canvas::Canvas;
use crate::input::FrameInput;

/// One overlay toy, driven by the host's render loop.
///
/// Three operations per frame, in order: `update` (advance one frame,
/// consumes input), `draw` (paint current state, no mutation), `overlay`
/// (optional diagnostic text, no mutation). Nothing else is exposed;
/// windowing, input binding and persistence are the host's business.
pub trait Simulation {
    fn name(&self) -> &str;

    /// Advance one frame.
    fn update(&mut self, input: &FrameInput);

    /// Paint the current state.
    fn draw(&self, canvas: &mut dyn Canvas);

    /// Diagnostic text lines for the host HUD.
    fn overlay(&self, lines: &mut Vec<String>);

    /// Screen/monitor size changed. Simulation state that depends on the
    /// grid is reset; configuration is kept.
    fn resize(&mut self, width: u32, height: u32);
}

/// The four overlay toys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimulationKind {
    Sand,
    Snow,
    Fireworks,
    Drawing,
}

impl SimulationKind {
    pub const ALL: [SimulationKind; 4] = [
        SimulationKind::Sand,
        SimulationKind::Snow,
        SimulationKind::Fireworks,
        SimulationKind::Drawing,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SimulationKind::Sand => "Sand",
            SimulationKind::Snow => "Snow",
            SimulationKind::Fireworks => "Fireworks",
            SimulationKind::Drawing => "Drawing",
        }
    }

    /// The next kind in display order, wrapping around.
    pub fn next(self) -> Self {
        match self {
            SimulationKind::Sand => SimulationKind::Snow,
            SimulationKind::Snow => SimulationKind::Fireworks,
            SimulationKind::Fireworks => SimulationKind::Drawing,
            SimulationKind::Drawing => SimulationKind::Sand,
        }
    }
}

/// Side table owning one instance per simulation kind.
///
/// Switching the active kind never tears down the inactive toys, so a sand
/// pile survives a detour through the snow globe. Instances are built
/// lazily on first activation.
pub struct Registry {
    sims: AHashMap<SimulationKind, Box<dyn Simulation>>,
    active: SimulationKind,
}

impl Registry {
    pub fn new(active: SimulationKind) -> Self {
        Self {
            sims: AHashMap::new(),
            active,
        }
    }

    pub fn active_kind(&self) -> SimulationKind {
        self.active
    }

    pub fn switch(&mut self, kind: SimulationKind) {
        if kind != self.active {
            log::debug!("switching simulation: {:?} -> {:?}", self.active, kind);
            self.active = kind;
        }
    }

    /// The active simulation, built with `build` if this kind has never
    /// run before.
    pub fn active_mut(
        &mut self,
        build: impl FnOnce(SimulationKind) -> Box<dyn Simulation>,
    ) -> &mut dyn Simulation {
        let kind = self.active;
        self.sims.entry(kind).or_insert_with(|| build(kind)).as_mut()
    }

    /// Propagate a screen resize to every live instance.
    pub fn resize_all(&mut self, width: u32, height: u32) {
        for sim in self.sims.values_mut() {
            sim.resize(width, height);
        }
    }

    pub fn live_count(&self) -> usize {
        self.sims.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts its own updates so tests can see state survive a switch.
    struct Counter {
        updates: usize,
    }

    impl Simulation for Counter {
        fn name(&self) -> &str {
            "Counter"
        }

        fn update(&mut self, _input: &FrameInput) {
            self.updates += 1;
        }

        fn draw(&self, _canvas: &mut dyn Canvas) {}

        fn overlay(&self, lines: &mut Vec<String>) {
            lines.push(format!("updates: {}", self.updates));
        }

        fn resize(&mut self, _width: u32, _height: u32) {}
    }

    fn build(_kind: SimulationKind) -> Box<dyn Simulation> {
        Box::new(Counter { updates: 0 })
    }

    #[test]
    fn test_instances_are_built_lazily() {
        let mut registry = Registry::new(SimulationKind::Sand);
        assert_eq!(registry.live_count(), 0);
        registry.active_mut(build);
        assert_eq!(registry.live_count(), 1);
        registry.active_mut(build);
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn test_switch_preserves_instance_state() {
        let mut registry = Registry::new(SimulationKind::Sand);
        let input = FrameInput::idle(100, 100, 1.0 / 60.0, 0.0);

        registry.active_mut(build).update(&input);
        registry.active_mut(build).update(&input);

        registry.switch(SimulationKind::Snow);
        registry.active_mut(build).update(&input);

        registry.switch(SimulationKind::Sand);
        let mut lines = Vec::new();
        registry.active_mut(build).overlay(&mut lines);
        assert_eq!(lines, vec!["updates: 2".to_string()]);
        assert_eq!(registry.live_count(), 2);
    }

    #[test]
    fn test_kind_cycle_visits_all() {
        let mut kind = SimulationKind::Sand;
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(kind);
            kind = kind.next();
        }
        assert_eq!(kind, SimulationKind::Sand);
        assert_eq!(seen, SimulationKind::ALL);
    }
}
