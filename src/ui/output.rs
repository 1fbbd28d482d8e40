use crate::output::is_quiet;
use crate::record::{Record, RecordKind};
use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}", Icons::ROCKET, text.style(theme().heading.clone()));
}

pub fn status(icon: &str, label: &str, value: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}: {}", icon, label.style(theme().label.clone()), value);
}

pub fn success(label: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}", Icons::CHECK, label.style(theme().ok.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().failure.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().caution.clone()));
}

pub fn info(label: &str, value: &str) {
    if is_quiet() {
        return;
    }
    println!(
        "{} {}: {}",
        Icons::INFO.style(theme().accent.clone()),
        label.style(theme().label.clone()),
        value
    );
}

pub fn section(title: &str) {
    if is_quiet() {
        return;
    }
    println!();
    println!("━{}━", title.style(theme().heading.clone()));
}

pub fn dim(text: &str) -> String {
    text.style(theme().label.clone()).to_string()
}

fn kind_icon(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Word => Icons::WORD,
        RecordKind::Definition => Icons::BOOK,
        RecordKind::Pattern => Icons::PATTERN,
    }
}

/// One-line rendering of a record
pub fn record_line(record: &Record) -> String {
    format!(
        "{} {} {}",
        kind_icon(record.kind),
        record.title.style(theme().kind(record.kind).clone()),
        dim(&format!("({} {})", record.kind, record.id))
    )
}

pub fn pending_name(name: &str, referencers: usize) {
    println!(
        "{} {} {}",
        Icons::HOURGLASS,
        name.style(theme().pattern.clone()),
        dim(&format!("← {} referencer(s)", referencers))
    );
}

pub fn timing(elapsed: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}", Icons::CLOCK.style(theme().label.clone()), elapsed);
}
