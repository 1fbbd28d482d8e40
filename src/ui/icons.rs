pub struct Icons;

impl Icons {
    pub const ROCKET: &str = "🚀";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const STATS: &str = "📊";
    pub const LINK: &str = "🔗";
    pub const BOOK: &str = "📖";
    pub const WORD: &str = "🔤";
    pub const PATTERN: &str = "🧩";
    pub const DEL: &str = "🗑️";
    pub const DATABASE: &str = "🗄️";
    pub const CLOCK: &str = "⏱️";
    pub const HOURGLASS: &str = "⏳";
    pub const RIGHT: &str = "➡️";
    pub const LEFT: &str = "⬅️";
    pub const GEAR: &str = "⚙️";
}
