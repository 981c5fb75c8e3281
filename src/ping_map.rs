//! Ping map: a self-extending ring of round outcomes
//!
//! The map starts small and grows in fixed steps until it reaches the size
//! the user asked for. Only then does it behave as a ring and overwrite the
//! oldest outcome.
//!
//! ```text
//! never wrapped:   [o o o o o _ _ _]      render = slots[0..pos]
//!                             ^pos
//! wrapped:         [n n n o o o o o]      render = slots[pos..] + slots[..pos]
//!                        ^pos (oldest)
//! ```

use crate::config::MapConfig;
use crate::error::{ConditionError, Result};
use tracing::debug;

/// Default glyph for a failed round
pub const DEFAULT_FAILURE_GLYPH: char = '-';

/// Default glyph for a successful round
pub const DEFAULT_SUCCESS_GLYPH: char = '+';

/// The two characters used to draw a map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapGlyphs {
    pub failure: char,
    pub success: char,
}

impl Default for MapGlyphs {
    fn default() -> Self {
        Self {
            failure: DEFAULT_FAILURE_GLYPH,
            success: DEFAULT_SUCCESS_GLYPH,
        }
    }
}

impl MapGlyphs {
    pub fn new(failure: char, success: char) -> Self {
        Self { failure, success }
    }

    /// Glyph for a single outcome
    pub fn glyph(&self, success: bool) -> char {
        if success {
            self.success
        } else {
            self.failure
        }
    }
}

/// Bounded history of round outcomes
///
/// # Example
/// ```
/// use pingexit::config::MapConfig;
/// use pingexit::ping_map::{MapGlyphs, PingMap};
///
/// # fn main() -> pingexit::error::Result<()> {
/// let mut map = PingMap::new(3, MapGlyphs::default(), &MapConfig::default())?;
/// for outcome in [true, false, true, true] {
///     map.record(outcome);
/// }
/// assert_eq!(map.render(), "-++");
/// assert!(map.is_wrapped());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PingMap {
    /// Allocated slots; `slots.len()` is the current capacity
    slots: Vec<bool>,

    /// Next slot to write
    write_position: usize,

    /// Set the first time `write_position` jumps back to 0
    wrapped: bool,

    /// Capacity limit; growth stops here
    max_size: usize,

    /// Growth step
    extension: usize,

    glyphs: MapGlyphs,
}

impl PingMap {
    /// Create a map that may hold up to `max_size` outcomes
    ///
    /// The initial allocation is `min(max_size, config.initial_max)`. Failure
    /// to allocate it is reported rather than aborting, since it happens
    /// while the `-x` argument is being parsed.
    ///
    /// # Panics
    ///
    /// Panics if `max_size` is 0.
    pub fn new(max_size: usize, glyphs: MapGlyphs, config: &MapConfig) -> Result<Self> {
        assert!(max_size > 0, "Ping map size must be > 0");

        let capacity = config.initial_capacity(max_size).max(1);
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| ConditionError::MapAllocation {
                requested: capacity,
            })?;
        slots.resize(capacity, false);

        debug!(capacity, max_size, "created ping map");

        Ok(Self {
            slots,
            write_position: 0,
            wrapped: false,
            max_size,
            extension: config.extension.max(1),
            glyphs,
        })
    }

    /// Append one outcome, growing or wrapping as needed
    pub fn record(&mut self, success: bool) {
        if self.write_position == self.slots.len() {
            self.grow();
            if self.write_position == self.slots.len() {
                self.write_position = 0;
                self.wrapped = true;
            }
        }

        self.slots[self.write_position] = success;
        self.write_position += 1;

        debug_assert!(self.write_position <= self.slots.len());
    }

    /// Add one extension step of capacity, bounded by `max_size`
    ///
    /// Existing outcomes and `write_position` are left untouched. An
    /// allocation failure here aborts the process: silently dropping history
    /// would break the size guarantee of the map.
    pub fn grow(&mut self) {
        let old = self.slots.len();
        if old >= self.max_size {
            return;
        }

        let new = old.saturating_add(self.extension).min(self.max_size);
        self.slots.resize(new, false);

        debug!(
            from = old,
            to = new,
            max_size = self.max_size,
            "extended ping map"
        );
    }

    /// Outcomes in chronological order, oldest first
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        let (older, newer): (&[bool], &[bool]) = if self.wrapped {
            (
                &self.slots[self.write_position..],
                &self.slots[..self.write_position],
            )
        } else {
            (&self.slots[..self.write_position], &[])
        };
        older.iter().chain(newer).copied()
    }

    /// Render the map oldest to newest using the configured glyphs
    pub fn render(&self) -> String {
        self.iter().map(|s| self.glyphs.glyph(s)).collect()
    }

    /// Physical slot layout plus a caret line under `write_position`
    ///
    /// Unwritten slots show as `.`. Diagnostic only.
    pub fn render_debug(&self) -> String {
        let mut out: String = self
            .slots
            .iter()
            .enumerate()
            .map(|(i, &s)| {
                if self.wrapped || i < self.write_position {
                    self.glyphs.glyph(s)
                } else {
                    '.'
                }
            })
            .collect();
        out.push('\n');
        out.extend(std::iter::repeat(' ').take(self.write_position));
        out.push('^');
        out
    }

    /// Number of outcomes currently retained
    pub fn len(&self) -> usize {
        if self.wrapped {
            self.slots.len()
        } else {
            self.write_position
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Currently allocated slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn write_position(&self) -> usize {
        self.write_position
    }

    pub fn is_wrapped(&self) -> bool {
        self.wrapped
    }

    pub fn glyphs(&self) -> MapGlyphs {
        self.glyphs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> MapConfig {
        MapConfig::new().with_initial_max(10).with_extension(3)
    }

    fn record_all(map: &mut PingMap, outcomes: &[bool]) {
        for &o in outcomes {
            map.record(o);
        }
    }

    #[test]
    fn test_new_map_is_empty() {
        let map = PingMap::new(100, MapGlyphs::default(), &MapConfig::default()).unwrap();
        assert_eq!(map.capacity(), 100);
        assert_eq!(map.write_position(), 0);
        assert!(map.is_empty());
        assert!(!map.is_wrapped());
        assert_eq!(map.render(), "");
    }

    #[test]
    fn test_initial_allocation_capped() {
        let map = PingMap::new(20, MapGlyphs::default(), &small_config()).unwrap();
        assert_eq!(map.capacity(), 10);
        assert_eq!(map.max_size(), 20);
    }

    #[test]
    #[should_panic(expected = "Ping map size must be > 0")]
    fn test_zero_size_panics() {
        let _ = PingMap::new(0, MapGlyphs::default(), &MapConfig::default());
    }

    #[test]
    fn test_record_before_full() {
        let mut map = PingMap::new(10, MapGlyphs::default(), &MapConfig::default()).unwrap();
        record_all(&mut map, &[true, false, true]);
        assert_eq!(map.render(), "+-+");
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_fill_exactly_does_not_wrap() {
        let mut map = PingMap::new(4, MapGlyphs::default(), &MapConfig::default()).unwrap();
        record_all(&mut map, &[true, true, false, false]);
        assert!(!map.is_wrapped());
        assert_eq!(map.write_position(), 4);
        assert_eq!(map.render(), "++--");
    }

    #[test]
    fn test_grows_by_extension_steps() {
        let mut map = PingMap::new(20, MapGlyphs::default(), &small_config()).unwrap();
        record_all(&mut map, &[true; 11]);
        assert_eq!(map.capacity(), 13);
        record_all(&mut map, &[false; 3]);
        assert_eq!(map.capacity(), 16);
        assert_eq!(map.render(), "+++++++++++---");
        assert!(!map.is_wrapped());
    }

    #[test]
    fn test_growth_capped_at_max_size() {
        let mut map = PingMap::new(12, MapGlyphs::default(), &small_config()).unwrap();
        record_all(&mut map, &[true; 11]);
        assert_eq!(map.capacity(), 12);
        map.grow();
        assert_eq!(map.capacity(), 12);
    }

    #[test]
    fn test_wrap_overwrites_oldest() {
        let mut map = PingMap::new(5, MapGlyphs::default(), &MapConfig::default()).unwrap();
        record_all(&mut map, &[false, false, true, true, true, false, true]);
        assert!(map.is_wrapped());
        assert_eq!(map.write_position(), 2);
        assert_eq!(map.len(), 5);
        assert_eq!(map.render(), "+++-+");
    }

    #[test]
    fn test_render_does_not_disturb_writes() {
        let mut map = PingMap::new(3, MapGlyphs::default(), &MapConfig::default()).unwrap();
        record_all(&mut map, &[true, false, true, false]);
        let first = map.render();
        assert_eq!(first, map.render());
        map.record(true);
        assert_eq!(map.render(), "+-+");
    }

    #[test]
    fn test_custom_glyphs() {
        let glyphs = MapGlyphs::new('b', 'a');
        let mut map = PingMap::new(10, glyphs, &MapConfig::default()).unwrap();
        record_all(&mut map, &[true, false, true, true, false]);
        assert_eq!(map.render(), "abaab");
    }

    #[test]
    fn test_render_debug_marks_write_position() {
        let mut map = PingMap::new(4, MapGlyphs::default(), &MapConfig::default()).unwrap();
        record_all(&mut map, &[true, false]);
        assert_eq!(map.render_debug(), "+-..\n  ^");
    }

    #[test]
    fn test_render_debug_after_wrap() {
        let mut map = PingMap::new(3, MapGlyphs::default(), &MapConfig::default()).unwrap();
        record_all(&mut map, &[true, true, true, false]);
        assert_eq!(map.render_debug(), "-++\n ^");
    }

    #[test]
    fn test_iter_is_chronological() {
        let mut map = PingMap::new(3, MapGlyphs::default(), &MapConfig::default()).unwrap();
        record_all(&mut map, &[false, true, true, false]);
        let outcomes: Vec<bool> = map.iter().collect();
        assert_eq!(outcomes, vec![true, true, false]);
    }
}
