//! Compilation context - what a compile action may see.
//!
//! A target's context is its own declarations merged with the contexts of its
//! dependencies and the toolchain. Lists keep first-occurrence order and drop
//! later duplicates, except `defines`, where a repeated define moves to its
//! latest position so the last definition still wins.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::artifact::Artifact;
use crate::core::variables::BuildVariables;
use crate::util::paths::to_slash;

/// A module map and the module name it declares.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleMapRef {
    pub name: String,
    pub file: Artifact,
}

/// Include paths, defines, headers, and module maps visible to compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilationContext {
    /// `-iquote` roots
    pub quote_include_dirs: Vec<PathBuf>,

    /// `-I` directories
    pub include_dirs: Vec<PathBuf>,

    /// `-isystem` directories
    pub system_include_dirs: Vec<PathBuf>,

    pub defines: Vec<String>,

    /// Headers that may legally be included
    pub declared_include_srcs: Vec<Artifact>,

    /// Directories whose headers may be included without being declared
    pub declared_include_dirs: Vec<PathBuf>,

    /// Directories the compiler searches implicitly
    pub builtin_include_dirs: Vec<PathBuf>,

    pub module_map: Option<ModuleMapRef>,

    /// Module maps of all dependencies
    pub transitive_module_maps: Vec<ModuleMapRef>,

    /// Files that must exist before compiling
    pub compilation_prerequisites: Vec<Artifact>,
}

pub(crate) fn extend_unique<T: PartialEq + Clone>(dst: &mut Vec<T>, src: &[T]) {
    for item in src {
        push_unique(dst, item.clone());
    }
}

pub(crate) fn push_unique<T: PartialEq>(dst: &mut Vec<T>, item: T) {
    if !dst.contains(&item) {
        dst.push(item);
    }
}

/// Append `src`, moving any value already in `dst` to the end.
pub(crate) fn extend_last_wins<T: PartialEq + Clone>(dst: &mut Vec<T>, src: &[T]) {
    for item in src {
        dst.retain(|existing| existing != item);
        dst.push(item.clone());
    }
}

impl CompilationContext {
    /// Merge a dependency's context into this one.
    ///
    /// The dependency's own module map becomes a transitive one.
    pub fn merge_dependency(&mut self, dep: &CompilationContext) {
        extend_unique(&mut self.quote_include_dirs, &dep.quote_include_dirs);
        extend_unique(&mut self.include_dirs, &dep.include_dirs);
        extend_unique(&mut self.system_include_dirs, &dep.system_include_dirs);
        extend_last_wins(&mut self.defines, &dep.defines);
        extend_unique(&mut self.declared_include_srcs, &dep.declared_include_srcs);
        extend_unique(&mut self.declared_include_dirs, &dep.declared_include_dirs);
        extend_unique(&mut self.builtin_include_dirs, &dep.builtin_include_dirs);
        if let Some(map) = &dep.module_map {
            push_unique(&mut self.transitive_module_maps, map.clone());
        }
        extend_unique(&mut self.transitive_module_maps, &dep.transitive_module_maps);
        extend_unique(
            &mut self.compilation_prerequisites,
            &dep.compilation_prerequisites,
        );
    }

    /// Expose include paths and defines as list variables.
    pub fn add_variables(&self, vars: &mut BuildVariables) {
        let paths = |dirs: &[PathBuf]| dirs.iter().map(|d| to_slash(d)).collect::<Vec<_>>();
        vars.insert_list("quote_include_paths", paths(&self.quote_include_dirs));
        vars.insert_list("include_paths", paths(&self.include_dirs));
        vars.insert_list("system_include_paths", paths(&self.system_include_dirs));
        vars.insert_list("preprocessor_defines", self.defines.clone());
        if let Some(map) = &self.module_map {
            vars.insert_string("module_name", map.name.clone());
            vars.insert_string("module_map_file", to_slash(map.file.exec_path()));
        }
        vars.insert_list(
            "dependent_module_map_files",
            self.transitive_module_maps
                .iter()
                .map(|m| to_slash(m.file.exec_path()))
                .collect(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_first_occurrence() {
        let mut local = CompilationContext {
            quote_include_dirs: vec![PathBuf::from("."), PathBuf::from("out/genfiles")],
            ..Default::default()
        };
        let dep = CompilationContext {
            quote_include_dirs: vec![PathBuf::from("out/genfiles"), PathBuf::from(".")],
            defines: vec!["DEP=1".into()],
            module_map: Some(ModuleMapRef {
                name: "//base:base".into(),
                file: Artifact::derived("out/bin", "base/base.cppmap"),
            }),
            ..Default::default()
        };
        local.merge_dependency(&dep);
        local.merge_dependency(&dep);

        assert_eq!(
            local.quote_include_dirs,
            vec![PathBuf::from("."), PathBuf::from("out/genfiles")]
        );
        assert_eq!(local.defines, vec!["DEP=1"]);
        assert_eq!(local.transitive_module_maps.len(), 1);
        assert!(local.module_map.is_none());
    }

    #[test]
    fn test_repeated_define_moves_to_latest_position() {
        let mut local = CompilationContext {
            defines: vec!["MODE=1".into(), "MODE=2".into()],
            ..Default::default()
        };
        let dep = CompilationContext {
            defines: vec!["MODE=1".into(), "TRACE".into()],
            ..Default::default()
        };
        local.merge_dependency(&dep);
        assert_eq!(local.defines, vec!["MODE=2", "MODE=1", "TRACE"]);
    }

    #[test]
    fn test_variables() {
        let ctx = CompilationContext {
            system_include_dirs: vec![PathBuf::from("third_party/zlib/include")],
            defines: vec!["NDEBUG".into()],
            ..Default::default()
        };
        let mut vars = BuildVariables::new();
        ctx.add_variables(&mut vars);
        assert_eq!(
            vars.get("system_include_paths"),
            Some(&crate::core::variables::VariableValue::List(vec![
                "third_party/zlib/include".into()
            ]))
        );
        assert!(!vars.contains("module_map_file"));
    }
}
