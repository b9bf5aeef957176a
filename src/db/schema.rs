pub const SCHEMA: &str = r#"
-- articles table, keyed by the externally assigned article id
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    author TEXT,
    url TEXT UNIQUE NOT NULL,
    category TEXT,
    content_html TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- lookups used by the query front end
CREATE INDEX IF NOT EXISTS idx_title ON articles(title);
CREATE INDEX IF NOT EXISTS idx_author ON articles(author);
CREATE INDEX IF NOT EXISTS idx_category ON articles(category);
"#;
