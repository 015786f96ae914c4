//! Labelled counter families addressed by [`LabelKey`].

use std::collections::BTreeMap;

use bqe_core::LabelKey;
use prometheus::core::Collector;
use prometheus::{IntCounterVec, Opts};

/// An `IntCounterVec` whose series are addressed by [`LabelKey`] in label
/// declaration order.
#[derive(Clone)]
pub struct CounterFamily {
    vec: IntCounterVec,
    labels: Vec<String>,
}

impl CounterFamily {
    pub fn new(opts: Opts, labels: &[&str]) -> prometheus::Result<Self> {
        Ok(Self {
            vec: IntCounterVec::new(opts, labels)?,
            labels: labels.iter().map(|l| l.to_string()).collect(),
        })
    }

    pub fn inc(&self, key: &LabelKey) {
        self.inc_by(key, 1);
    }

    pub fn inc_by(&self, key: &LabelKey, delta: u64) {
        debug_assert_eq!(key.len(), self.labels.len(), "label arity mismatch for {key}");
        self.vec.with_label_values(&key.values()).inc_by(delta);
    }

    /// Current value of one series, 0 if it has never been incremented.
    pub fn get(&self, key: &LabelKey) -> u64 {
        self.snapshot().get(key).copied().unwrap_or(0)
    }

    /// Point-in-time copy of every series. Does not create series.
    pub fn snapshot(&self) -> BTreeMap<LabelKey, u64> {
        self.vec
            .collect()
            .iter()
            .flat_map(|family| family.get_metric())
            .map(|metric| {
                let mut values = vec![""; self.labels.len()];
                for pair in metric.get_label() {
                    if let Some(i) = self.labels.iter().position(|l| l == pair.get_name()) {
                        values[i] = pair.get_value();
                    }
                }
                (LabelKey::new(values), metric.get_counter().get_value() as u64)
            })
            .collect()
    }

    pub fn collector(&self) -> &dyn Collector {
        &self.vec
    }
}

impl std::fmt::Debug for CounterFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterFamily").field("labels", &self.labels).finish_non_exhaustive()
    }
}
