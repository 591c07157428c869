// src/config/validate.rs

use std::path::Path;

use globset::Glob;

use crate::config::model::BuildConfig;
use crate::errors::{PagesError, Result};

/// Check invariants serde cannot express.
pub fn validate_config(cfg: &BuildConfig) -> Result<()> {
    validate_dirs(cfg)?;
    validate_globs(cfg)?;
    validate_server(cfg)?;
    Ok(())
}

fn validate_dirs(cfg: &BuildConfig) -> Result<()> {
    let b = &cfg.build;
    for (name, dir) in [("src", &b.src), ("dist", &b.dist), ("temp", &b.temp)] {
        if dir.as_os_str().is_empty() {
            return Err(PagesError::Config(format!("[build].{name} must not be empty")));
        }
    }

    // `clean` removes dist and temp, so neither may alias the other or src.
    if same_dir(&b.dist, &b.temp) {
        return Err(PagesError::Config(format!(
            "[build].dist and [build].temp must differ (both are {:?})",
            b.dist
        )));
    }
    for (name, dir) in [("dist", &b.dist), ("temp", &b.temp)] {
        if same_dir(dir, &b.src) {
            return Err(PagesError::Config(format!(
                "[build].{name} must not be the source directory {:?}",
                b.src
            )));
        }
    }
    Ok(())
}

fn same_dir(a: &Path, b: &Path) -> bool {
    a.components().eq(b.components())
}

fn validate_globs(cfg: &BuildConfig) -> Result<()> {
    let p = &cfg.build.paths;
    for (name, pattern) in [
        ("styles", &p.styles),
        ("scripts", &p.scripts),
        ("pages", &p.pages),
        ("images", &p.images),
        ("fonts", &p.fonts),
    ] {
        Glob::new(pattern).map_err(|e| {
            PagesError::Config(format!("[build.paths].{name} is not a valid glob: {e}"))
        })?;
    }
    Ok(())
}

fn validate_server(cfg: &BuildConfig) -> Result<()> {
    let s = &cfg.server;
    if s.port != 0 && s.port == s.reload_port {
        return Err(PagesError::Config(format!(
            "[server].port and [server].reload_port must differ (both are {})",
            s.port
        )));
    }
    for prefix in s.routes.keys() {
        if !prefix.starts_with('/') {
            return Err(PagesError::Config(format!(
                "[server].routes key {prefix:?} must start with '/'"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::config::loader::load_from_str;
    use crate::errors::PagesError;

    const PATHS: &str = r#"
[build.paths]
styles = "*.scss"
scripts = "*.js"
pages = "*.html"
images = "img/**"
fonts = "fonts/**"
"#;

    fn with_build(build: &str) -> String {
        format!("[build]\n{build}\n{PATHS}")
    }

    #[test]
    fn dist_equal_to_temp_is_rejected() {
        let doc = with_build("src = \"s\"\ndist = \"out\"\ntemp = \"out\"\npublic = \"p\"");
        assert!(matches!(load_from_str(&doc), Err(PagesError::Config(_))));
    }

    #[test]
    fn dist_equal_to_src_is_rejected() {
        let doc = with_build("src = \"s\"\ndist = \"s\"\ntemp = \"t\"\npublic = \"p\"");
        assert!(matches!(load_from_str(&doc), Err(PagesError::Config(_))));
    }

    #[test]
    fn empty_src_is_rejected() {
        let doc = with_build("src = \"\"\ndist = \"d\"\ntemp = \"t\"\npublic = \"p\"");
        assert!(matches!(load_from_str(&doc), Err(PagesError::Config(_))));
    }

    #[test]
    fn bad_glob_is_rejected() {
        let doc = "[build]\nsrc = \"s\"\ndist = \"d\"\ntemp = \"t\"\npublic = \"p\"\n\
                   [build.paths]\nstyles = \"[\"\nscripts = \"*.js\"\npages = \"*.html\"\n\
                   images = \"i/**\"\nfonts = \"f/**\"\n";
        let err = load_from_str(doc).unwrap_err();
        assert!(err.to_string().contains("styles"), "{err}");
    }

    #[test]
    fn complete_custom_build_is_accepted() {
        let doc = with_build("src = \"app\"\ndist = \"out\"\ntemp = \".tmp\"\npublic = \"static\"");
        let cfg = load_from_str(&doc).unwrap();
        assert_eq!(cfg.build.src.to_str(), Some("app"));
        assert_eq!(cfg.build.paths.images, "img/**");
    }

    #[test]
    fn clashing_ports_are_rejected() {
        let doc = "[server]\nport = 4000\nreload_port = 4000\n";
        assert!(matches!(load_from_str(doc), Err(PagesError::Config(_))));
    }
}
