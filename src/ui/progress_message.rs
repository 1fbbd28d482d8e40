#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProgressPhase {
    Reading,
    Ingesting,
}

#[derive(Clone, Debug)]
pub enum ProgressMessage {
    Started {
        phase: ProgressPhase,
        total: usize,
    },
    /// One entry done; `line` is its 1-based line in the corpus
    Progress {
        phase: ProgressPhase,
        line: usize,
        title: Option<String>,
    },
    Finished {
        phase: ProgressPhase,
    },
    Skipped(String),
    Error(String),
}
