use crate::domain::model::{AtomicLine, DetectedLine, IdentifiedLine};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    pub identified: Vec<IdentifiedLine>,
    pub unidentified: Vec<f64>,
}

/// Matches detected lines against the atomic database. The database is
/// scanned in stored order and the first entry within tolerance wins, even if
/// a later entry is closer.
#[derive(Debug, Clone)]
pub struct LineMatcher<'a> {
    database: &'a [AtomicLine],
    tolerance: f64,
}

impl<'a> LineMatcher<'a> {
    pub fn new(database: &'a [AtomicLine], tolerance: f64) -> Self {
        Self {
            database,
            tolerance,
        }
    }

    pub fn identify(&self, line: &DetectedLine) -> Option<&'a AtomicLine> {
        self.database
            .iter()
            .find(|known| (line.wavelength - known.wavelength).abs() <= self.tolerance)
    }

    pub fn match_lines(&self, lines: &[DetectedLine]) -> MatchOutcome {
        let mut outcome = MatchOutcome::default();

        for line in lines {
            match self.identify(line) {
                Some(known) => outcome.identified.push(IdentifiedLine {
                    wavelength: line.wavelength,
                    equivalent_width: line.equivalent_width,
                    element: known.label.clone(),
                }),
                None => outcome.unidentified.push(line.wavelength),
            }
        }

        tracing::debug!(
            "Matched {} of {} lines against {} database entries",
            outcome.identified.len(),
            lines.len(),
            self.database.len()
        );
        outcome
    }
}
