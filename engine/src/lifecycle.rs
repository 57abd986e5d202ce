//! Ordered init/exit/cmdline-arg hooks (§4.1).
//!
//! Mirrors the teacher's `NSI_TASK`/component-init ordering: hooks declare
//! a phase and a priority; within a phase, lower priority numbers run
//! first. The registry is generic over the target type so it has no
//! dependency on what a "peripheral" looks like.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Register command-line arguments this component understands.
    PreBoot1,
    /// Resolve args that depend on other args (defaults, cross-checks).
    PreBoot2,
    /// Allocate and zero register banks, set reset values.
    HwInit,
    /// Free heap buffers, unmap backing files.
    OnExitPre,
}

struct Hook<T> {
    phase: Phase,
    priority: i32,
    name: &'static str,
    f: Box<dyn FnMut(&mut T)>,
}

/// A registry of lifecycle hooks over some owner type `T` (in this crate's
/// use, `T` is the simulator's `World`).
pub struct LifecycleRegistry<T> {
    hooks: Vec<Hook<T>>,
}

impl<T> Default for LifecycleRegistry<T> {
    fn default() -> Self {
        LifecycleRegistry { hooks: Vec::new() }
    }
}

impl<T> LifecycleRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        phase: Phase,
        priority: i32,
        name: &'static str,
        f: impl FnMut(&mut T) + 'static,
    ) {
        self.hooks.push(Hook {
            phase,
            priority,
            name,
            f: Box::new(f),
        });
    }

    /// Run every hook registered for `phase`, in priority order (ties break
    /// in registration order, matching the teacher's stable-sort component
    /// init ordering).
    pub fn run_phase(&mut self, phase: Phase, target: &mut T) {
        let mut indices: Vec<usize> = (0..self.hooks.len())
            .filter(|&i| self.hooks[i].phase == phase)
            .collect();
        indices.sort_by_key(|&i| self.hooks[i].priority);
        for i in indices {
            log::debug!("lifecycle: running {:?}/{}", phase, self.hooks[i].name);
            (self.hooks[i].f)(target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hooks_run_in_priority_order_within_a_phase() {
        let mut reg: LifecycleRegistry<Vec<&'static str>> = LifecycleRegistry::new();
        reg.register(Phase::HwInit, 200, "late", |v| v.push("late"));
        reg.register(Phase::HwInit, 10, "dppi", |v| v.push("dppi"));
        reg.register(Phase::HwInit, 100, "mid", |v| v.push("mid"));
        reg.register(Phase::PreBoot1, 0, "args", |v| v.push("args"));

        let mut order = Vec::new();
        reg.run_phase(Phase::PreBoot1, &mut order);
        reg.run_phase(Phase::HwInit, &mut order);
        assert_eq!(order, vec!["args", "dppi", "mid", "late"]);
    }
}
