//! Last-seen reading cache
//!
//! The sensor reports the same value over and over while conditions are
//! stable. [`LastSeen`] keeps the most recent value of each quantity so only
//! changes are published.

use cozir_protocol::{Measurement, MeasurementKind, Tenths};

/// Most recent value of each measured quantity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LastSeen {
    co2_ppm: Option<u32>,
    temperature: Option<Tenths>,
    humidity: Option<Tenths>,
}

impl LastSeen {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a measurement, returning `true` if it is new
    ///
    /// A measurement is new if its slot was unset or held a different value.
    /// The slot always holds `measurement` afterwards.
    pub fn observe(&mut self, measurement: &Measurement) -> bool {
        match *measurement {
            Measurement::Co2 { ppm } => replace_if_changed(&mut self.co2_ppm, ppm),
            Measurement::Temperature { celsius } => {
                replace_if_changed(&mut self.temperature, celsius)
            }
            Measurement::Humidity { percent } => replace_if_changed(&mut self.humidity, percent),
        }
    }

    /// Last value recorded for a quantity
    pub fn get(&self, kind: MeasurementKind) -> Option<Measurement> {
        match kind {
            MeasurementKind::Co2 => self.co2_ppm.map(|ppm| Measurement::Co2 { ppm }),
            MeasurementKind::Temperature => self
                .temperature
                .map(|celsius| Measurement::Temperature { celsius }),
            MeasurementKind::Humidity => self
                .humidity
                .map(|percent| Measurement::Humidity { percent }),
        }
    }

    /// Forget all values
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

fn replace_if_changed<T: PartialEq>(slot: &mut Option<T>, value: T) -> bool {
    if slot.as_ref() == Some(&value) {
        return false;
    }
    *slot = Some(value);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_reading_is_new() {
        let mut cache = LastSeen::new();
        assert!(cache.observe(&Measurement::Co2 { ppm: 0 }));
        assert_eq!(
            cache.get(MeasurementKind::Co2),
            Some(Measurement::Co2 { ppm: 0 })
        );
    }

    #[test]
    fn test_duplicate_suppressed_then_change_emitted() {
        let mut cache = LastSeen::new();
        assert!(cache.observe(&Measurement::Co2 { ppm: 412 }));
        assert!(!cache.observe(&Measurement::Co2 { ppm: 412 }));
        assert!(cache.observe(&Measurement::Co2 { ppm: 415 }));
        assert_eq!(
            cache.get(MeasurementKind::Co2),
            Some(Measurement::Co2 { ppm: 415 })
        );
    }

    #[test]
    fn test_slots_are_independent() {
        let mut cache = LastSeen::new();
        let temp = Measurement::Temperature {
            celsius: Tenths::new(234),
        };
        let humidity = Measurement::Humidity {
            percent: Tenths::new(234),
        };
        assert!(cache.observe(&temp));
        assert!(cache.observe(&humidity));
        assert!(!cache.observe(&temp));
        assert_eq!(cache.get(MeasurementKind::Co2), None);
    }

    #[test]
    fn test_clear() {
        let mut cache = LastSeen::new();
        cache.observe(&Measurement::Co2 { ppm: 412 });
        cache.clear();
        assert_eq!(cache, LastSeen::new());
        assert!(cache.observe(&Measurement::Co2 { ppm: 412 }));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn new_readings_match_value_changes(values in proptest::collection::vec(0u32..5, 0..50)) {
                let mut cache = LastSeen::new();
                let published = values
                    .iter()
                    .filter(|&&ppm| cache.observe(&Measurement::Co2 { ppm }))
                    .count();

                let mut changes = values.len().min(1);
                changes += values.windows(2).filter(|w| w[0] != w[1]).count();
                prop_assert_eq!(published, changes);
            }
        }
    }
}
