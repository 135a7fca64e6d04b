//! Prompt template loading and placeholder substitution.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template `{name}` not found under {dir}")]
    NotFound { name: String, dir: String },

    #[error("failed to read template `{name}`: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Loads named templates from a directory.
///
/// Files are re-read on every call so templates can be edited between
/// requests without a restart.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: PathBuf,
    extension: &'static str,
}

impl TemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            extension: "txt",
        }
    }

    pub fn with_extension(dir: impl Into<PathBuf>, extension: &'static str) -> Self {
        Self {
            dir: dir.into(),
            extension,
        }
    }

    /// Read `<dir>/<name>.<extension>`.
    pub fn load(&self, name: &str) -> Result<String, TemplateError> {
        let path = self.dir.join(format!("{}.{}", name, self.extension));
        if !path.is_file() {
            return Err(TemplateError::NotFound {
                name: name.to_string(),
                dir: self.dir.display().to_string(),
            });
        }
        std::fs::read_to_string(&path).map_err(|source| TemplateError::Io {
            name: name.to_string(),
            source,
        })
    }

    /// Startup check: every named template must load. A missing template is a
    /// deployment misconfiguration and should halt the process.
    pub fn verify(&self, names: &[&str]) -> Result<(), TemplateError> {
        for name in names {
            self.load(name)?;
        }
        Ok(())
    }
}

/// Replace each literal `{key}` token with its value, verbatim.
///
/// No escaping and no nested expansion. Substitutions are applied in pair
/// order, so a value that itself contains `{key}`-shaped text may be
/// rewritten by a later pair. Known limitation, kept deliberately.
/// Placeholders with no matching key are left untouched.
pub fn render(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in substitutions {
        out = out.replace(&format!("{{{}}}", key), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_render_substitutes_placeholder() {
        assert_eq!(render("Hello {name}", &[("name", "world")]), "Hello world");
    }

    #[test]
    fn test_render_leaves_unresolved_placeholders() {
        assert_eq!(render("Hello {name}", &[]), "Hello {name}");
        assert_eq!(
            render("{a} and {b}", &[("a", "one")]),
            "one and {b}"
        );
    }

    #[test]
    fn test_render_replaces_every_occurrence() {
        assert_eq!(
            render("{x}, {x} and {y}", &[("x", "1"), ("y", "2")]),
            "1, 1 and 2"
        );
    }

    #[test]
    fn test_render_value_verbatim_no_nested_expansion() {
        // A value containing placeholder-shaped text for an earlier key is
        // left as-is; only later pairs could touch it.
        assert_eq!(render("{a}", &[("a", "{a}")]), "{a}");
    }

    #[test]
    fn test_load_reads_named_template() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sql.txt"), "schema: {regen_schema}").unwrap();

        let store = TemplateStore::new(dir.path());
        assert_eq!(store.load("sql").unwrap(), "schema: {regen_schema}");
    }

    #[test]
    fn test_load_missing_template_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::new(dir.path());

        let err = store.load("sql").unwrap_err();
        assert!(matches!(err, TemplateError::NotFound { .. }));
    }

    #[test]
    fn test_verify_checks_all_names() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sql.txt"), "a").unwrap();
        fs::write(dir.path().join("idk.txt"), "b").unwrap();

        let store = TemplateStore::new(dir.path());
        assert!(store.verify(&["sql", "idk"]).is_ok());
        assert!(store.verify(&["sql", "idk", "graph"]).is_err());
    }

    #[test]
    fn test_custom_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<html>{json_data}</html>").unwrap();

        let store = TemplateStore::with_extension(dir.path(), "html");
        assert!(store.load("index").unwrap().contains("{json_data}"));
    }
}
