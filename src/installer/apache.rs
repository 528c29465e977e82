// Apache httpd.conf editor for the application server's module
use crate::error::InstallError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const MODULE_NAME: &str = "caucho_module";
pub const MODULE_SECTION: &str = "mod_caucho.c";

/// Highest `.bak-N` tried before giving up.
const MAX_BACKUPS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfLine {
    Blank(String),
    Comment(String),
    Directive {
        name: String,
        args: Vec<String>,
        raw: String,
    },
    SectionStart {
        name: String,
        args: Vec<String>,
        raw: String,
    },
    SectionEnd {
        name: String,
        raw: String,
    },
}

impl ConfLine {
    pub fn raw(&self) -> &str {
        match self {
            ConfLine::Blank(raw) | ConfLine::Comment(raw) => raw,
            ConfLine::Directive { raw, .. }
            | ConfLine::SectionStart { raw, .. }
            | ConfLine::SectionEnd { raw, .. } => raw,
        }
    }

    fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return ConfLine::Blank(raw.to_string());
        }
        if trimmed.starts_with('#') {
            return ConfLine::Comment(raw.to_string());
        }

        if let Some(inner) = trimmed.strip_prefix("</") {
            let name = inner.trim_end_matches('>').trim().to_string();
            return ConfLine::SectionEnd {
                name,
                raw: raw.to_string(),
            };
        }
        if let Some(inner) = trimmed.strip_prefix('<') {
            let mut words = split_args(inner.trim_end_matches('>'));
            let name = if words.is_empty() {
                String::new()
            } else {
                words.remove(0)
            };
            return ConfLine::SectionStart {
                name,
                args: words,
                raw: raw.to_string(),
            };
        }

        let mut words = split_args(trimmed);
        if words.is_empty() {
            return ConfLine::Blank(raw.to_string());
        }
        let name = words.remove(0);
        ConfLine::Directive {
            name,
            args: words,
            raw: raw.to_string(),
        }
    }

    fn is_module_load(&self) -> bool {
        matches!(self, ConfLine::Directive { name, args, .. }
            if name.eq_ignore_ascii_case("LoadModule")
                && args.first().is_some_and(|m| m == MODULE_NAME))
    }

    fn is_module_section(&self) -> bool {
        matches!(self, ConfLine::SectionStart { name, args, .. }
            if name.eq_ignore_ascii_case("IfModule")
                && args.first().is_some_and(|m| m == MODULE_SECTION))
    }
}

/// Whitespace-separated words; double quotes group words.
fn split_args(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in text.chars() {
        match c {
            '"' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfFile {
    pub lines: Vec<ConfLine>,
    line_ending: &'static str,
}

impl ConfFile {
    pub fn parse(text: &str) -> Self {
        Self {
            lines: text.lines().map(ConfLine::parse).collect(),
            line_ending: if text.contains("\r\n") { "\r\n" } else { "\n" },
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line.raw());
            out.push_str(self.line_ending);
        }
        out
    }

    /// Line ranges (end exclusive) belonging to an earlier module setup.
    fn module_ranges(&self) -> Vec<(usize, usize)> {
        let mut ranges = Vec::new();
        let mut i = 0;
        while i < self.lines.len() {
            let line = &self.lines[i];
            if line.is_module_load() {
                ranges.push((i, i + 1));
                i += 1;
            } else if line.is_module_section() {
                let end = self.section_end(i);
                ranges.push((i, end));
                i = end;
            } else {
                i += 1;
            }
        }
        ranges
    }

    /// Index just past the line closing the section opened at `start`, or
    /// the end of the file when it is never closed.
    fn section_end(&self, start: usize) -> usize {
        let mut depth = 0usize;
        for (offset, line) in self.lines[start..].iter().enumerate() {
            match line {
                ConfLine::SectionStart { .. } => depth += 1,
                ConfLine::SectionEnd { .. } => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return start + offset + 1;
                    }
                }
                _ => {}
            }
        }
        self.lines.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSettings {
    pub module_path: PathBuf,
    pub host: String,
    pub port: u16,
}

impl ModuleSettings {
    fn block(&self) -> Vec<String> {
        vec![
            String::new(),
            format!(
                "LoadModule {} \"{}\"",
                MODULE_NAME,
                self.module_path.display()
            ),
            String::new(),
            format!("<IfModule {}>", MODULE_SECTION),
            format!("  ResinConfigServer {} {}", self.host, self.port),
            "  CauchoStatus yes".to_string(),
            "  <Location /caucho-status>".to_string(),
            "    SetHandler caucho-status".to_string(),
            "  </Location>".to_string(),
            "</IfModule>".to_string(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp {
    /// Drop lines `start..end`.
    Remove { start: usize, end: usize },
    Append(Vec<String>),
}

/// Edits that take out any earlier module setup and, given settings, add a
/// fresh one at the end.
pub fn plan_edits(conf: &ConfFile, settings: Option<&ModuleSettings>) -> Vec<EditOp> {
    let mut ops: Vec<EditOp> = conf
        .module_ranges()
        .into_iter()
        .map(|(start, end)| EditOp::Remove { start, end })
        .collect();

    if let Some(settings) = settings {
        ops.push(EditOp::Append(settings.block()));
    }
    ops
}

pub fn apply_edits(conf: &ConfFile, ops: &[EditOp]) -> ConfFile {
    let removed = |index: usize| {
        ops.iter().any(|op| match op {
            EditOp::Remove { start, end } => (*start..*end).contains(&index),
            EditOp::Append(_) => false,
        })
    };

    let mut lines: Vec<ConfLine> = conf
        .lines
        .iter()
        .enumerate()
        .filter(|(i, _)| !removed(*i))
        .map(|(_, line)| line.clone())
        .collect();

    for op in ops {
        if let EditOp::Append(block) = op {
            // one blank line between the old tail and the new block
            while matches!(lines.last(), Some(ConfLine::Blank(_))) {
                lines.pop();
            }
            lines.extend(block.iter().map(|raw| ConfLine::parse(raw)));
        }
    }

    ConfFile {
        lines,
        line_ending: conf.line_ending,
    }
}

/// `<conf>.bak`, or `<conf>.bak-N` with the first free N.
pub fn backup_path(conf: &Path) -> Result<PathBuf, InstallError> {
    let with_suffix = |suffix: &str| {
        let mut name = conf.as_os_str().to_os_string();
        name.push(suffix);
        PathBuf::from(name)
    };

    let first = with_suffix(".bak");
    if !first.exists() {
        return Ok(first);
    }
    (1..MAX_BACKUPS)
        .map(|n| with_suffix(&format!(".bak-{}", n)))
        .find(|path| !path.exists())
        .ok_or_else(|| InstallError::BackupExhausted(conf.to_path_buf()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigureOutcome {
    pub backup: PathBuf,
    pub removed_blocks: usize,
    pub added: bool,
}

/// Rewrites `conf`; with `settings` of `None` the module is only removed.
/// Nothing is edited unless the backup was written first.
pub fn configure_apache(
    conf: &Path,
    settings: Option<&ModuleSettings>,
) -> Result<ConfigureOutcome, InstallError> {
    let text = fs::read_to_string(conf).map_err(|source| InstallError::Read {
        path: conf.to_path_buf(),
        source,
    })?;

    let backup = backup_path(conf)?;
    write_backup(&backup, text.as_bytes())?;
    tracing::info!("Backed up {} to {}", conf.display(), backup.display());

    let parsed = ConfFile::parse(&text);
    let ops = plan_edits(&parsed, settings);
    let removed_blocks = ops
        .iter()
        .filter(|op| matches!(op, EditOp::Remove { .. }))
        .count();
    let updated = apply_edits(&parsed, &ops);

    fs::write(conf, updated.render()).map_err(|source| InstallError::Write {
        path: conf.to_path_buf(),
        source,
    })?;
    tracing::info!(
        "Updated {}: removed {} old module entries{}",
        conf.display(),
        removed_blocks,
        if settings.is_some() { ", added module block" } else { "" }
    );

    Ok(ConfigureOutcome {
        backup,
        removed_blocks,
        added: settings.is_some(),
    })
}

fn write_backup(path: &Path, contents: &[u8]) -> Result<(), InstallError> {
    let to_error = |source| InstallError::Backup {
        path: path.to_path_buf(),
        source,
    };

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(to_error)?;
    file.write_all(contents).map_err(to_error)?;
    file.sync_all().map_err(to_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTTPD_CONF: &str = "\
ServerRoot \"/usr/local/apache2\"
Listen 80
LoadModule mime_module modules/mod_mime.so
LoadModule caucho_module /old/mod_caucho.so

<IfModule mod_caucho.c>
  ResinConfigServer old-host 6800
  <Location /caucho-status>
    SetHandler caucho-status
  </Location>
</IfModule>

# keep me
DocumentRoot \"/var/www\"
";

    fn settings() -> ModuleSettings {
        ModuleSettings {
            module_path: PathBuf::from("/opt/resin/mod_caucho.so"),
            host: "localhost".to_string(),
            port: 6800,
        }
    }

    #[test]
    fn test_parse_lines() {
        let conf = ConfFile::parse(HTTPD_CONF);
        assert_eq!(
            conf.lines[0],
            ConfLine::Directive {
                name: "ServerRoot".into(),
                args: vec!["/usr/local/apache2".into()],
                raw: "ServerRoot \"/usr/local/apache2\"".into(),
            }
        );
        assert!(conf.lines[3].is_module_load());
        assert!(conf.lines[5].is_module_section());
        assert!(matches!(conf.lines[12], ConfLine::Comment(_)));
        assert_eq!(conf.render(), HTTPD_CONF);
    }

    #[test]
    fn test_plan_removes_old_setup() {
        let conf = ConfFile::parse(HTTPD_CONF);
        let ops = plan_edits(&conf, None);
        assert_eq!(
            ops,
            vec![
                EditOp::Remove { start: 3, end: 4 },
                EditOp::Remove { start: 5, end: 11 },
            ]
        );

        let text = apply_edits(&conf, &ops).render();
        assert!(!text.contains("caucho"));
        assert!(text.contains("LoadModule mime_module"));
        assert!(text.contains("# keep me"));
    }

    #[test]
    fn test_configure_writes_backup_then_edits() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("httpd.conf");
        fs::write(&conf, HTTPD_CONF).unwrap();

        let outcome = configure_apache(&conf, Some(&settings())).unwrap();
        assert_eq!(outcome.backup, dir.path().join("httpd.conf.bak"));
        assert_eq!(outcome.removed_blocks, 2);
        assert_eq!(fs::read_to_string(&outcome.backup).unwrap(), HTTPD_CONF);

        let text = fs::read_to_string(&conf).unwrap();
        assert_eq!(text.matches("LoadModule caucho_module").count(), 1);
        assert!(text.contains("LoadModule caucho_module \"/opt/resin/mod_caucho.so\""));
        assert!(text.contains("ResinConfigServer localhost 6800"));
        assert!(!text.contains("old-host"));

        // running again keeps one block and picks the next backup name
        let outcome = configure_apache(&conf, Some(&settings())).unwrap();
        assert_eq!(outcome.backup, dir.path().join("httpd.conf.bak-1"));
        let again = fs::read_to_string(&conf).unwrap();
        assert_eq!(again, text);
    }

    #[test]
    fn test_backup_failure_leaves_conf_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("httpd.conf");
        fs::write(&conf, HTTPD_CONF).unwrap();
        // every backup name already taken
        fs::create_dir(dir.path().join("httpd.conf.bak")).unwrap();
        for n in 1..MAX_BACKUPS {
            fs::create_dir(dir.path().join(format!("httpd.conf.bak-{}", n))).unwrap();
        }

        let err = configure_apache(&conf, Some(&settings())).unwrap_err();
        assert!(matches!(err, InstallError::BackupExhausted(_)));
        assert_eq!(fs::read_to_string(&conf).unwrap(), HTTPD_CONF);
    }

    #[test]
    fn test_missing_conf_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = configure_apache(&dir.path().join("missing.conf"), None).unwrap_err();
        assert!(matches!(err, InstallError::Read { .. }));
    }
}
