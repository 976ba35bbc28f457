// src/vm/lines.rs

/// One source line and how many consecutive bytes were emitted for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRun {
    pub line: usize,
    pub length: usize,
}

/// Run-length encoded map from bytecode offset to source line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineTable {
    runs: Vec<LineRun>,
}

impl LineTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one more byte emitted for `line`.
    pub fn append(&mut self, line: usize) {
        match self.runs.last_mut() {
            Some(run) if run.line == line => run.length += 1,
            _ => self.runs.push(LineRun { line, length: 1 }),
        }
    }

    /// The line of the byte at `offset`, or `None` past the end.
    pub fn lookup(&self, offset: usize) -> Option<usize> {
        let mut covered = 0;
        for run in &self.runs {
            covered += run.length;
            if offset < covered {
                return Some(run.line);
            }
        }
        None
    }

    /// Total number of bytes recorded.
    pub fn total(&self) -> usize {
        self.runs.iter().map(|run| run.length).sum()
    }

    pub fn runs(&self) -> &[LineRun] {
        &self.runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_consecutive_lines_collapse() {
        let mut lines = LineTable::new();
        for line in [1, 1, 1, 2, 2, 5, 1] {
            lines.append(line);
        }
        assert_eq!(
            lines.runs(),
            &[
                LineRun { line: 1, length: 3 },
                LineRun { line: 2, length: 2 },
                LineRun { line: 5, length: 1 },
                LineRun { line: 1, length: 1 },
            ]
        );
        assert_eq!(lines.total(), 7);
        assert_eq!(lines.lookup(0), Some(1));
        assert_eq!(lines.lookup(2), Some(1));
        assert_eq!(lines.lookup(3), Some(2));
        assert_eq!(lines.lookup(5), Some(5));
        assert_eq!(lines.lookup(6), Some(1));
        assert_eq!(lines.lookup(7), None);
    }

    #[test]
    fn test_empty_table() {
        let lines = LineTable::new();
        assert_eq!(lines.lookup(0), None);
        assert_eq!(lines.total(), 0);
    }

    #[test]
    fn test_random_sequences_resolve_every_offset() {
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let mut lines = LineTable::new();
            let mut expected = Vec::new();
            let mut line = 1;
            for _ in 0..rng.gen_range(1..200) {
                if rng.gen_bool(0.3) {
                    line += rng.gen_range(1..4);
                }
                lines.append(line);
                expected.push(line);
            }
            for (offset, line) in expected.iter().enumerate() {
                assert_eq!(lines.lookup(offset), Some(*line));
            }
            assert_eq!(lines.total(), expected.len());
        }
    }
}
