//! Clang module map generation.

use std::path::{Path, PathBuf};

use crate::builder::compilation::ModuleMapRef;
use crate::core::artifact::Artifact;
use crate::util::paths::{relative_path, to_slash};

/// Headers and dependencies that go into one module map.
#[derive(Debug, Clone, Default)]
pub struct ModuleMapContents<'a> {
    pub public_headers: Vec<&'a Artifact>,
    pub private_headers: Vec<&'a Artifact>,
    /// Headers that are only ever included textually
    pub textual_headers: Vec<&'a Artifact>,
    pub additional_exported_headers: Vec<&'a Path>,
    pub dependencies: Vec<&'a ModuleMapRef>,
}

/// Rendering switches taken from the resolved features.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleMapOptions {
    /// Headers may be compiled as modules (`header_module_compile`)
    pub compiled_module: bool,
    /// Paths are relative to the execution root (`module_map_home_cwd`)
    pub home_cwd: bool,
}

struct PathRenderer {
    map_dir: PathBuf,
    home_cwd: bool,
}

impl PathRenderer {
    fn new(map: &ModuleMapRef, home_cwd: bool) -> Self {
        let map_dir = map
            .file
            .exec_path()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        PathRenderer { map_dir, home_cwd }
    }

    fn render(&self, path: &Path) -> String {
        if self.home_cwd {
            to_slash(path)
        } else {
            to_slash(&relative_path(&self.map_dir, path))
        }
    }
}

/// Render the text of a module map.
pub fn render_module_map(
    map: &ModuleMapRef,
    contents: &ModuleMapContents<'_>,
    options: ModuleMapOptions,
) -> String {
    let paths = PathRenderer::new(map, options.home_cwd);
    let mut lines = vec![format!("module \"{}\" {{", map.name), "  export *".to_string()];

    for header in &contents.private_headers {
        let textual = !options.compiled_module || contents.textual_headers.contains(header);
        let kind = if textual {
            "private textual header"
        } else {
            "private header"
        };
        lines.push(format!("  {} \"{}\"", kind, paths.render(header.exec_path())));
    }

    for header in &contents.public_headers {
        let textual = !options.compiled_module || contents.textual_headers.contains(header);
        let kind = if textual { "textual header" } else { "header" };
        lines.push(format!("  {} \"{}\"", kind, paths.render(header.exec_path())));
    }

    for header in &contents.additional_exported_headers {
        lines.push(format!("  textual header \"{}\"", paths.render(header)));
    }

    for header in &contents.textual_headers {
        if !contents.public_headers.contains(header) && !contents.private_headers.contains(header) {
            lines.push(format!("  textual header \"{}\"", paths.render(header.exec_path())));
        }
    }

    lines.extend(
        contents
            .dependencies
            .iter()
            .map(|dep| format!("  use \"{}\"", dep.name)),
    );
    lines.push("}".to_string());

    lines.extend(contents.dependencies.iter().map(|dep| {
        format!(
            "extern module \"{}\" \"{}\"",
            dep.name,
            paths.render(dep.file.exec_path())
        )
    }));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
