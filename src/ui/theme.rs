use crate::record::RecordKind;
use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Terminal palette. Each record kind has its own color; pending names use
/// the pattern color since only patterns are ever waited on.
#[derive(Debug, Clone)]
pub struct Theme {
    pub heading: Style,
    pub ok: Style,
    pub failure: Style,
    pub caution: Style,
    pub accent: Style,
    pub label: Style,
    pub word: Style,
    pub definition: Style,
    pub pattern: Style,
}

impl Theme {
    /// Colors only on a terminal, and never when `NO_COLOR` is set
    pub fn detect() -> Self {
        let colored = std::env::var_os("NO_COLOR").is_none() && console::Term::stdout().is_term();
        Self::new(colored)
    }

    pub fn new(colored: bool) -> Self {
        let pick = |style: Style| if colored { style } else { Style::new() };
        Self {
            heading: pick(Style::new().bold()),
            ok: pick(Style::new().green().bold()),
            failure: pick(Style::new().red().bold()),
            caution: pick(Style::new().yellow().bold()),
            accent: pick(Style::new().magenta()),
            label: pick(Style::new().dimmed()),
            word: pick(Style::new().cyan().bold()),
            definition: pick(Style::new().blue()),
            pattern: pick(Style::new().yellow()),
        }
    }

    /// Style of a record title of `kind`
    pub fn kind(&self, kind: RecordKind) -> &Style {
        match kind {
            RecordKind::Word => &self.word,
            RecordKind::Definition => &self.definition,
            RecordKind::Pattern => &self.pattern,
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_picks_record_palette() {
        let theme = Theme::new(false);
        assert!(std::ptr::eq(theme.kind(RecordKind::Word), &theme.word));
        assert!(std::ptr::eq(theme.kind(RecordKind::Definition), &theme.definition));
        assert!(std::ptr::eq(theme.kind(RecordKind::Pattern), &theme.pattern));
    }
}
