use std::fs;

/// Everything the feature pipeline needs to read about one pid. Abstracted
/// so tests never touch a real `/proc`; [`RealProcFeatureSource`] is the
/// only implementation that does.
pub trait ProcFeatureSource: Send + Sync {
    fn attr(&self, pid: i32) -> Option<String>;
    fn cgroup(&self, pid: i32) -> Option<String>;
    fn cmdline(&self, pid: i32) -> Option<String>;
    fn comm(&self, pid: i32) -> Option<String>;
    fn environ(&self, pid: i32) -> Option<String>;
    fn exe(&self, pid: i32) -> Option<String>;
    fn maps(&self, pid: i32) -> Option<String>;
    fn fd_entries(&self, pid: i32) -> Vec<String>;
    /// A bounded slice of the system journal already filtered to `pid`.
    fn journal_slice(&self, pid: i32) -> Vec<String>;
}

pub struct RealProcFeatureSource {
    proc_root: std::path::PathBuf,
}

impl RealProcFeatureSource {
    pub fn new() -> Self {
        RealProcFeatureSource { proc_root: std::path::PathBuf::from("/proc") }
    }

    fn read(&self, pid: i32, leaf: &str) -> Option<String> {
        fs::read_to_string(self.proc_root.join(pid.to_string()).join(leaf)).ok()
    }
}

impl Default for RealProcFeatureSource {
    fn default() -> Self {
        RealProcFeatureSource::new()
    }
}

impl ProcFeatureSource for RealProcFeatureSource {
    fn attr(&self, pid: i32) -> Option<String> {
        self.read(pid, "attr/current")
    }
    fn cgroup(&self, pid: i32) -> Option<String> {
        self.read(pid, "cgroup")
    }
    fn cmdline(&self, pid: i32) -> Option<String> {
        self.read(pid, "cmdline")
    }
    fn comm(&self, pid: i32) -> Option<String> {
        self.read(pid, "comm")
    }
    fn environ(&self, pid: i32) -> Option<String> {
        self.read(pid, "environ")
    }
    fn exe(&self, pid: i32) -> Option<String> {
        fs::read_link(self.proc_root.join(pid.to_string()).join("exe")).ok().map(|p| p.to_string_lossy().into_owned())
    }
    fn maps(&self, pid: i32) -> Option<String> {
        self.read(pid, "maps")
    }
    fn fd_entries(&self, pid: i32) -> Vec<String> {
        fs::read_dir(self.proc_root.join(pid.to_string()).join("fd"))
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter_map(|e| fs::read_link(e.path()).ok())
                    .map(|p| p.to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }
    fn journal_slice(&self, _pid: i32) -> Vec<String> {
        // The system journal is out of this crate's scope; a real daemon
        // wires this through whatever log-shipping capability it has.
        Vec::new()
    }
}

const REPETITION_WEIGHTS: &[(&str, usize)] =
    &[("attr", 1), ("cgroup", 1), ("cmdline", 5), ("comm", 5), ("maps", 2), ("fd", 1), ("environ", 1), ("exe", 5), ("logs", 1)];

const REMOVAL_SET: &[&str] = &["unconfined", "usr", "bin", "lib", "app.slice", "user.slice"];

const BROWSER_VOCAB: &[&str] = &[
    "firefox", "chrome", "chromium", "webkit", "gecko", "safari", "opera", "brave", "vivaldi", "edge", "lynx", "w3m",
    "falkon", "httrack", "konqueror", "amfora", "luakit", "epiphany",
];

fn weight_for(label: &str) -> usize {
    REPETITION_WEIGHTS.iter().find(|(name, _)| *name == label).map(|(_, w)| *w).unwrap_or(1)
}

fn is_removed(token: &str) -> bool {
    if REMOVAL_SET.contains(&token) {
        return true;
    }
    if let Some(rest) = token.strip_prefix("user-").and_then(|r| r.strip_suffix(".slice")) {
        return rest.chars().all(|c| c.is_ascii_digit()) && !rest.is_empty();
    }
    if let Some(rest) = token.strip_prefix("user@").and_then(|r| r.strip_suffix(".service")) {
        return rest.chars().all(|c| c.is_ascii_digit()) && !rest.is_empty();
    }
    if token.starts_with("app-") && token.ends_with(".slice") {
        return true;
    }
    if token.starts_with("vte-spawn-") && token.ends_with(".scope") {
        return true;
    }
    false
}

fn is_hex_literal(token: &str) -> bool {
    let digits = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X"));
    match digits {
        Some(d) if !d.is_empty() => d.chars().all(|c| c.is_ascii_hexdigit()),
        _ => false,
    }
}

/// Replace every maximal run of 4+ ASCII digits inside `token` with `<num>`.
fn collapse_long_digit_runs(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let chars: Vec<char> = token.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            if i - start >= 4 {
                out.push_str("<num>");
            } else {
                out.extend(&chars[start..i]);
            }
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

fn clean_token(raw: &str) -> Option<String> {
    let lowered = raw.to_lowercase();
    let stripped: String = lowered.chars().filter(|c| !matches!(c, ',' | '[' | ']' | '(' | ')' | '{' | '}')).collect();
    let token = stripped.trim();
    if token.is_empty() || is_removed(token) {
        return None;
    }
    if token.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let token = if is_hex_literal(token) { "<hex>".to_string() } else { collapse_long_digit_runs(token) };
    if token.chars().count() < 2 {
        return None;
    }
    Some(token)
}

fn tokenize(raw: &str) -> Vec<String> {
    raw.replace('\0', " ").split_whitespace().filter_map(clean_token).collect()
}

/// Order-preserving dedup, except tokens in the browser vocabulary are
/// always kept even if they already appeared.
fn dedup_preserving_browser_vocab(tokens: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tokens.into_iter().filter(|t| BROWSER_VOCAB.contains(&t.as_str()) || seen.insert(t.clone())).collect()
}

/// Build the feature text fed to a [`crate::text_classifier::TextClassifier`],
/// applying the documented repetition weights and cleaning rules.
pub fn extract_features(pid: i32, source: &dyn ProcFeatureSource) -> String {
    let labeled: Vec<(&str, Vec<String>)> = vec![
        ("attr", source.attr(pid).into_iter().collect()),
        ("cgroup", source.cgroup(pid).into_iter().collect()),
        ("cmdline", source.cmdline(pid).into_iter().collect()),
        ("comm", source.comm(pid).into_iter().collect()),
        ("maps", source.maps(pid).into_iter().collect()),
        ("fd", source.fd_entries(pid)),
        ("environ", source.environ(pid).into_iter().collect()),
        ("exe", source.exe(pid).into_iter().collect()),
        ("logs", source.journal_slice(pid)),
    ];

    let mut tokens = Vec::new();
    for (label, chunks) in labeled {
        let weight = weight_for(label);
        let raw = chunks.join(" ");
        let cleaned = tokenize(&raw);
        for _ in 0..weight {
            tokens.extend(cleaned.iter().cloned());
        }
    }

    dedup_preserving_browser_vocab(tokens).join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FixedSource {
        fields: HashMap<&'static str, String>,
        fds: Vec<String>,
    }

    impl ProcFeatureSource for FixedSource {
        fn attr(&self, _pid: i32) -> Option<String> {
            self.fields.get("attr").cloned()
        }
        fn cgroup(&self, _pid: i32) -> Option<String> {
            self.fields.get("cgroup").cloned()
        }
        fn cmdline(&self, _pid: i32) -> Option<String> {
            self.fields.get("cmdline").cloned()
        }
        fn comm(&self, _pid: i32) -> Option<String> {
            self.fields.get("comm").cloned()
        }
        fn environ(&self, _pid: i32) -> Option<String> {
            self.fields.get("environ").cloned()
        }
        fn exe(&self, _pid: i32) -> Option<String> {
            self.fields.get("exe").cloned()
        }
        fn maps(&self, _pid: i32) -> Option<String> {
            self.fields.get("maps").cloned()
        }
        fn fd_entries(&self, _pid: i32) -> Vec<String> {
            self.fds.clone()
        }
        fn journal_slice(&self, _pid: i32) -> Vec<String> {
            Vec::new()
        }
    }

    #[test]
    fn drops_removal_set_and_pure_numeric_tokens() {
        let mut source = FixedSource::default();
        source.fields.insert("comm", "user.slice 12 firefox".into());
        let text = extract_features(1, &source);
        assert!(!text.contains("12"));
        assert!(!text.contains("user.slice"));
        assert!(text.contains("firefox"));
    }

    #[test]
    fn comm_is_weighted_five_times() {
        let mut source = FixedSource::default();
        source.fields.insert("comm", "uniquetoken".into());
        let text = extract_features(1, &source);
        // "uniquetoken" is not browser vocabulary, so repeats collapse to one.
        assert_eq!(text.matches("uniquetoken").count(), 1);
    }

    #[test]
    fn browser_vocabulary_survives_dedup_as_duplicates() {
        let mut source = FixedSource::default();
        source.fields.insert("comm", "firefox".into());
        let text = extract_features(1, &source);
        assert_eq!(text.matches("firefox").count(), 5);
    }

    #[test]
    fn hex_literals_and_long_digit_runs_are_masked() {
        let mut source = FixedSource::default();
        source.fields.insert("maps", "0x7fabcd00 12345 comm".into());
        let text = extract_features(1, &source);
        assert!(text.contains("<hex>"));
        assert!(text.contains("<num>"));
    }

    #[test]
    fn scoped_slice_names_are_removed() {
        let mut source = FixedSource::default();
        source.fields.insert("cgroup", "user-1000.slice user@1000.service app-foo.slice vte-spawn-abc.scope real".into());
        let text = extract_features(1, &source);
        assert_eq!(text, "real");
    }
}
