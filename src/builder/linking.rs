//! Linking outputs and runfiles.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::artifact::Artifact;
use crate::core::library::LibraryToLink;
use crate::util::paths::to_slash;

/// How a final binary links its libraries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    Static,
    Dynamic,
}

impl fmt::Display for LinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkMode::Static => f.write_str("static"),
            LinkMode::Dynamic => f.write_str("dynamic"),
        }
    }
}

/// Link flags declared by one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Linkopts {
    pub owner: String,
    pub flags: Vec<String>,
}

/// Libraries a target contributes to its dependents' link lines.
///
/// Each list holds at most one entry per library identifier, and `linkopts`
/// at most one entry per owning target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkingOutputs {
    pub static_libraries: Vec<LibraryToLink>,
    pub pic_static_libraries: Vec<LibraryToLink>,
    pub dynamic_libraries: Vec<LibraryToLink>,
    pub linkopts: Vec<Linkopts>,
}

fn add_unique(list: &mut Vec<LibraryToLink>, library: LibraryToLink) -> bool {
    if list.iter().any(|l| l.identifier() == library.identifier()) {
        false
    } else {
        list.push(library);
        true
    }
}

impl LinkingOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a library to the list matching its category.
    ///
    /// Returns `false` if a library with the same identifier is already there.
    pub fn add(&mut self, library: LibraryToLink) -> bool {
        let category = library.category();
        if category.is_dynamic() {
            add_unique(&mut self.dynamic_libraries, library)
        } else if category.is_pic() {
            add_unique(&mut self.pic_static_libraries, library)
        } else {
            add_unique(&mut self.static_libraries, library)
        }
    }

    /// Record the link flags declared by `owner`.
    pub fn add_linkopts(&mut self, owner: impl Into<String>, flags: Vec<String>) -> bool {
        let owner = owner.into();
        if flags.is_empty() || self.linkopts.iter().any(|l| l.owner == owner) {
            return false;
        }
        self.linkopts.push(Linkopts { owner, flags });
        true
    }

    /// All link flags in first-seen owner order.
    pub fn linkopt_flags(&self) -> Vec<String> {
        self.linkopts
            .iter()
            .flat_map(|l| l.flags.iter().cloned())
            .collect()
    }

    /// Union another set of outputs into this one, keeping ours on collision.
    pub fn merge(&mut self, other: &LinkingOutputs) {
        for library in other
            .static_libraries
            .iter()
            .chain(&other.pic_static_libraries)
            .chain(&other.dynamic_libraries)
        {
            if !self.add(library.clone()) {
                tracing::trace!("library {} already present", library.identifier());
            }
        }
        for opts in &other.linkopts {
            self.add_linkopts(opts.owner.clone(), opts.flags.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.static_libraries.is_empty()
            && self.pic_static_libraries.is_empty()
            && self.dynamic_libraries.is_empty()
            && self.linkopts.is_empty()
    }

    /// Library identifiers in first-seen order.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for library in self
            .static_libraries
            .iter()
            .chain(&self.pic_static_libraries)
            .chain(&self.dynamic_libraries)
        {
            if !seen.contains(&library.identifier()) {
                seen.push(library.identifier());
            }
        }
        seen
    }

    fn find<'a>(list: &'a [LibraryToLink], identifier: &str) -> Option<&'a LibraryToLink> {
        list.iter().find(|l| l.identifier() == identifier)
    }

    /// Pick exactly one variant per library for a link.
    pub fn link_line(&self, mode: LinkMode, use_pic: bool) -> Vec<&LibraryToLink> {
        let (preferred_static, fallback_static) = if use_pic {
            (&self.pic_static_libraries, &self.static_libraries)
        } else {
            (&self.static_libraries, &self.pic_static_libraries)
        };

        self.identifiers()
            .into_iter()
            .filter_map(|id| {
                let static_choice = Self::find(preferred_static, id)
                    .or_else(|| Self::find(fallback_static, id));
                let dynamic_choice = Self::find(&self.dynamic_libraries, id);
                match mode {
                    LinkMode::Static => static_choice.or(dynamic_choice),
                    LinkMode::Dynamic => dynamic_choice.or(static_choice),
                }
            })
            .collect()
    }

    /// Dynamic libraries needed at runtime for a link.
    pub fn runtime_libraries(&self, mode: LinkMode, use_pic: bool) -> Runfiles {
        let mut runfiles = Runfiles::new();
        for library in self.link_line(mode, use_pic) {
            if library.category().is_dynamic() {
                runfiles.add(library.artifact().clone());
                runfiles.add(library.original_artifact().clone());
            }
        }
        runfiles
    }
}

/// Files needed at runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Runfiles {
    files: BTreeSet<Artifact>,
}

impl Runfiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, artifact: Artifact) {
        self.files.insert(artifact);
    }

    pub fn merge(&mut self, other: &Runfiles) {
        self.files.extend(other.files.iter().cloned());
    }

    pub fn contains(&self, artifact: &Artifact) -> bool {
        self.files.contains(artifact)
    }

    pub fn files(&self) -> impl Iterator<Item = &Artifact> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<Artifact> for Runfiles {
    fn from_iter<I: IntoIterator<Item = Artifact>>(iter: I) -> Self {
        Runfiles {
            files: iter.into_iter().collect(),
        }
    }
}

/// Runfiles for both link modes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunfilesPair {
    pub static_mode: Runfiles,
    pub dynamic_mode: Runfiles,
}

impl RunfilesPair {
    pub fn get(&self, mode: LinkMode) -> &Runfiles {
        match mode {
            LinkMode::Static => &self.static_mode,
            LinkMode::Dynamic => &self.dynamic_mode,
        }
    }
}

/// Path of a shared library's symlink under `_solib_<cpu>/`, relative to the
/// output root.
///
/// The directory part of the library's execution path is escaped (`_` becomes
/// `_U`, `/` becomes `_S`) so distinct libraries never share a name.
pub fn solib_symlink_path(target_cpu: &str, library: &Artifact) -> PathBuf {
    let dir = library
        .exec_path()
        .parent()
        .map(to_slash)
        .unwrap_or_default();
    let mut mangled = String::with_capacity(dir.len() + 8);
    for c in dir.chars() {
        match c {
            '_' => mangled.push_str("_U"),
            '/' => mangled.push_str("_S"),
            c => mangled.push(c),
        }
    }
    PathBuf::from(format!("_solib_{}", target_cpu))
        .join(format!("lib{}_S{}", mangled, library.basename()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::library::ArtifactCategory;

    fn archive(path: &str, category: ArtifactCategory) -> LibraryToLink {
        LibraryToLink::simple(Artifact::source(path), category)
    }

    #[test]
    fn test_add_dedupes_by_identifier() {
        let mut outputs = LinkingOutputs::new();
        assert!(outputs.add(archive("net/libhttp.a", ArtifactCategory::StaticLibrary)));
        assert!(!outputs.add(LibraryToLink::simple(
            Artifact::derived("out/bin", "net/libhttp.a"),
            ArtifactCategory::StaticLibrary
        )));
        assert!(outputs.add(archive("net/libhttp.pic.a", ArtifactCategory::PicStaticLibrary)));
        assert_eq!(outputs.static_libraries.len(), 1);
        assert_eq!(outputs.pic_static_libraries.len(), 1);
        assert_eq!(outputs.identifiers(), vec!["net/libhttp"]);
    }

    #[test]
    fn test_diamond_linkopts_appear_once() {
        let mut shared = LinkingOutputs::new();
        shared.add_linkopts("//base:base", vec!["-lpthread".into()]);

        let mut left = LinkingOutputs::new();
        left.add_linkopts("//net:http", vec!["-lz".into()]);
        left.merge(&shared);
        let mut right = LinkingOutputs::new();
        right.add_linkopts("//net:rpc", vec!["-Wl,--as-needed".into(), "-lpthread".into()]);
        right.merge(&shared);

        let mut top = LinkingOutputs::new();
        top.merge(&left);
        top.merge(&right);
        assert_eq!(
            top.linkopt_flags(),
            vec!["-lz", "-lpthread", "-Wl,--as-needed", "-lpthread"]
        );
        assert_eq!(top.linkopts.len(), 3);
    }

    #[test]
    fn test_link_line_picks_one_variant() {
        let mut outputs = LinkingOutputs::new();
        outputs.add(archive("net/libhttp.a", ArtifactCategory::StaticLibrary));
        outputs.add(archive("net/libhttp.pic.a", ArtifactCategory::PicStaticLibrary));
        outputs.add(archive("net/libhttp.so", ArtifactCategory::DynamicLibrary));
        outputs.add(archive("base/libbase.so", ArtifactCategory::DynamicLibrary));

        let line = outputs.link_line(LinkMode::Static, true);
        assert_eq!(line.len(), 2);
        assert_eq!(line[0].artifact().basename(), "libhttp.pic.a");
        assert_eq!(line[1].artifact().basename(), "libbase.so");

        let line = outputs.link_line(LinkMode::Static, false);
        assert_eq!(line[0].artifact().basename(), "libhttp.a");

        let line = outputs.link_line(LinkMode::Dynamic, false);
        assert_eq!(line[0].artifact().basename(), "libhttp.so");
    }

    #[test]
    fn test_runtime_libraries_follow_mode() {
        let so = Artifact::source("third_party/ssl/libssl.so");
        let link = Artifact::derived("out/bin", "_solib_k8/libthird_Uparty_Sssl_Slibssl.so");
        let mut outputs = LinkingOutputs::new();
        outputs.add(archive("third_party/ssl/libssl.a", ArtifactCategory::StaticLibrary));
        outputs.add(LibraryToLink::solib_symlink(
            link.clone(),
            so.clone(),
            ArtifactCategory::DynamicLibrary,
        ));

        assert!(outputs.runtime_libraries(LinkMode::Static, false).is_empty());
        let dynamic = outputs.runtime_libraries(LinkMode::Dynamic, false);
        assert!(dynamic.contains(&so));
        assert!(dynamic.contains(&link));
    }

    #[test]
    fn test_solib_mangling() {
        let lib = Artifact::source("third_party/ssl/libssl.so.1");
        assert_eq!(
            solib_symlink_path("k8", &lib),
            PathBuf::from("_solib_k8/libthird_Uparty_Sssl_Slibssl.so.1")
        );

        let a = solib_symlink_path("k8", &Artifact::source("a_b/c/libx.so"));
        let b = solib_symlink_path("k8", &Artifact::source("a/b_c/libx.so"));
        assert_ne!(a, b);
    }
}
