use simreg_common::{BASELINE_LEVEL, CaseError, StageResult};
use std::collections::BTreeMap;
use tracing::warn;

/// A resolved tolerance threshold
#[derive(Debug, Clone, PartialEq)]
pub struct Tolerance {
    pub level: String,
    pub value: f64,
}

/// Look up `requested` in `levels`, falling back to the baseline level.
///
/// The fallback is logged as a warning. Neither level present is a
/// `COMPARISON` failure.
pub fn resolve(levels: &BTreeMap<String, f64>, requested: &str) -> StageResult<Tolerance> {
    if let Some(&value) = levels.get(requested) {
        return Ok(Tolerance { level: requested.to_string(), value });
    }
    if let Some(&value) = levels.get(BASELINE_LEVEL) {
        warn!(
            target: "simreg::compare",
            "Tolerance level {requested} is not defined, falling back to {BASELINE_LEVEL} ({value:e})"
        );
        return Ok(Tolerance { level: BASELINE_LEVEL.to_string(), value });
    }
    Err(CaseError::comparison(format!(
        "Tolerance level {requested} is not defined and no {BASELINE_LEVEL} fallback exists."
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use simreg_common::Status;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    /// Collects formatted log output in memory
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn resolve_logged(levels: &BTreeMap<String, f64>, requested: &str) -> (Tolerance, String) {
        let logs = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_target(true)
            .finish();
        let tolerance =
            tracing::subscriber::with_default(subscriber, || resolve(levels, requested)).unwrap();
        (tolerance, logs.text())
    }

    fn levels(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn exact_level_wins() {
        let t = resolve(&levels(&[("level0", 0.0), ("level1", 1e-6)]), "level1").unwrap();
        assert_eq!(t, Tolerance { level: "level1".into(), value: 1e-6 });
    }

    #[test]
    fn falls_back_to_baseline() {
        let t = resolve(&levels(&[("level0", 1e-12)]), "level2").unwrap();
        assert_eq!(t.level, "level0");
        assert_eq!(t.value, 1e-12);
    }

    #[test]
    fn fallback_is_logged_as_warning() {
        let (t, logs) = resolve_logged(&levels(&[("level0", 1e-6)]), "level3");
        assert_eq!(t, Tolerance { level: "level0".into(), value: 1e-6 });
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains("simreg::compare"), "{logs}");
        assert!(
            logs.contains("Tolerance level level3 is not defined, falling back to level0"),
            "{logs}"
        );
    }

    #[test]
    fn defined_level_logs_nothing() {
        let (t, logs) = resolve_logged(&levels(&[("level0", 1e-6), ("level3", 1e-3)]), "level3");
        assert_eq!(t.value, 1e-3);
        assert!(logs.is_empty(), "{logs}");
    }

    #[test]
    fn no_level_is_comparison_failure() {
        let err = resolve(&levels(&[("level1", 1.0)]), "level2").unwrap_err();
        assert_eq!(err.status(), Status::Comparison);
        assert!(err.reason().contains("level2"));
    }
}
