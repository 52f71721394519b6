// src/progress.rs

/// Status sink for the two long phases of a run: resolving cache entities and
/// writing reports. Every method has a no-op default, so a frontend overrides
/// only what it shows.
pub trait Progress {
    /// Number of units about to be processed (entities or reports).
    fn begin(&mut self, _total: usize) {}

    fn log(&mut self, _msg: &str) {}

    /// One unit finished. `count` is rows resolved for an entity, or files
    /// written for a report.
    fn item_done(&mut self, _name: &str, _count: usize) {}

    fn finish(&mut self) {}
}
