//! Human-readable pass and library summaries.

use std::fmt;

use crate::archive::LibraryArtifact;
use crate::driver::{PassResult, UnitStatus};

/// Diagnostic lines shown per failed unit.
const DIAGNOSTIC_LINES: usize = 6;

impl fmt::Display for PassResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Compile Pass ===")?;
        writeln!(f, "Toolchain: {}", self.toolchain)?;
        writeln!(f, "Revision: {}", self.revision)?;
        writeln!(f, "Duration: {} ms", self.duration_ms)?;
        writeln!(
            f,
            "Units: {} ({} compiled, {} cached, {} failed, {} timed out, {} cancelled)",
            self.units.len(),
            self.count(UnitStatus::Compiled),
            self.count(UnitStatus::Cached),
            self.count(UnitStatus::Failed),
            self.count(UnitStatus::TimedOut),
            self.count(UnitStatus::Cancelled),
        )?;

        let failures: Vec<_> = self.failed_units().collect();
        if !failures.is_empty() {
            writeln!(f)?;
            writeln!(f, "--- Failures ({}) ---", failures.len())?;
            for unit in failures {
                writeln!(f, "  {} [{}]", unit.source.display(), unit.status)?;
                let lines: Vec<&str> = unit.diagnostics.lines().collect();
                for line in lines.iter().take(DIAGNOSTIC_LINES) {
                    writeln!(f, "    {line}")?;
                }
                if lines.len() > DIAGNOSTIC_LINES {
                    writeln!(f, "    ... {} more line(s)", lines.len() - DIAGNOSTIC_LINES)?;
                }
            }
        }

        writeln!(f)?;
        writeln!(f, "Result: {}", self.outcome)
    }
}

impl fmt::Display for LibraryArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Library ===")?;
        writeln!(f, "Path: {}", self.path.display())?;
        writeln!(f, "Objects: {}", self.objects.len())?;
        writeln!(f, "Size: {} bytes", self.size_bytes)?;
        writeln!(f, "SHA-256: {}", self.sha256)?;
        let toggles = self.snapshot.toggles;
        writeln!(
            f,
            "Variant: debug={} assert={} tiny={}",
            toggles.debug, toggles.assert, toggles.tiny
        )
    }
}
