//! Libraries to link.
//!
//! A library can reach the link line as a plain artifact, as a symlink under
//! the solib directory that stands in for a shared library, or as an archive
//! whose member objects are known. All three share the same accessor contract
//! and are de-duplicated by their library identifier, which is derived from
//! the originating artifact rather than the variant being linked.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::artifact::Artifact;
use crate::util::paths::to_slash;

/// Category of a linkable artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactCategory {
    StaticLibrary,
    PicStaticLibrary,
    AlwaysLinkStaticLibrary,
    AlwaysLinkPicStaticLibrary,
    DynamicLibrary,
    InterfaceLibrary,
    ObjectFile,
    PicObjectFile,
}

impl ArtifactCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactCategory::StaticLibrary => "static-library",
            ArtifactCategory::PicStaticLibrary => "pic-static-library",
            ArtifactCategory::AlwaysLinkStaticLibrary => "alwayslink-static-library",
            ArtifactCategory::AlwaysLinkPicStaticLibrary => "alwayslink-pic-static-library",
            ArtifactCategory::DynamicLibrary => "dynamic-library",
            ArtifactCategory::InterfaceLibrary => "interface-library",
            ArtifactCategory::ObjectFile => "object-file",
            ArtifactCategory::PicObjectFile => "pic-object-file",
        }
    }

    /// Classify a file name by extension, if it is linkable.
    pub fn classify(basename: &str) -> Option<Self> {
        if basename.ends_with(".pic.a") {
            Some(ArtifactCategory::PicStaticLibrary)
        } else if basename.ends_with(".pic.lo") {
            Some(ArtifactCategory::AlwaysLinkPicStaticLibrary)
        } else if basename.ends_with(".pic.o") {
            Some(ArtifactCategory::PicObjectFile)
        } else if basename.ends_with(".a") {
            Some(ArtifactCategory::StaticLibrary)
        } else if basename.ends_with(".lo") {
            Some(ArtifactCategory::AlwaysLinkStaticLibrary)
        } else if basename.ends_with(".o") {
            Some(ArtifactCategory::ObjectFile)
        } else if basename.ends_with(".ifso") {
            Some(ArtifactCategory::InterfaceLibrary)
        } else if basename.ends_with(".so")
            || basename.ends_with(".dylib")
            || is_versioned_shared_library(basename)
        {
            Some(ArtifactCategory::DynamicLibrary)
        } else {
            None
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(
            self,
            ArtifactCategory::StaticLibrary
                | ArtifactCategory::PicStaticLibrary
                | ArtifactCategory::AlwaysLinkStaticLibrary
                | ArtifactCategory::AlwaysLinkPicStaticLibrary
        )
    }

    pub fn is_pic(&self) -> bool {
        matches!(
            self,
            ArtifactCategory::PicStaticLibrary
                | ArtifactCategory::AlwaysLinkPicStaticLibrary
                | ArtifactCategory::PicObjectFile
        )
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(
            self,
            ArtifactCategory::DynamicLibrary | ArtifactCategory::InterfaceLibrary
        )
    }

    pub fn is_alwayslink(&self) -> bool {
        matches!(
            self,
            ArtifactCategory::AlwaysLinkStaticLibrary | ArtifactCategory::AlwaysLinkPicStaticLibrary
        )
    }
}

impl fmt::Display for ArtifactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `libfoo.so.1`, `libfoo.so.1.2.3`
fn is_versioned_shared_library(basename: &str) -> bool {
    match basename.find(".so.") {
        Some(idx) => {
            let version = &basename[idx + 4..];
            !version.is_empty()
                && version
                    .split('.')
                    .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
        }
        None => false,
    }
}

/// Suffixes stripped before the final extension when computing identifiers.
const COMPOUND_SUFFIXES: &[&str] = &[".pic.a", ".nopic.a", ".pic.lo"];

/// The logical identity of a library: its root-relative path with the
/// variant-specific suffix removed.
///
/// `out/bin/net/libhttp.pic.a`, `net/libhttp.a` and `net/libhttp.so` all map
/// to `net/libhttp`.
pub fn library_identifier(artifact: &Artifact) -> String {
    let path = to_slash(artifact.root_relative_path());

    for suffix in COMPOUND_SUFFIXES {
        if let Some(stripped) = path.strip_suffix(suffix) {
            return stripped.to_string();
        }
    }

    let (dir, base) = match path.rfind('/') {
        Some(idx) => (&path[..=idx], &path[idx + 1..]),
        None => ("", path.as_str()),
    };

    if is_versioned_shared_library(base) {
        if let Some(idx) = base.find(".so.") {
            return format!("{}{}", dir, &base[..idx]);
        }
    }

    match base.rfind('.') {
        Some(idx) if idx > 0 => format!("{}{}", dir, &base[..idx]),
        _ => path.clone(),
    }
}

/// A library as it reaches the link line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum LibraryToLink {
    /// An opaque library artifact.
    Simple {
        artifact: Artifact,
        category: ArtifactCategory,
        identifier: String,
    },

    /// A shared library renamed into the solib directory.
    SolibSymlink {
        symlink: Artifact,
        original: Artifact,
        category: ArtifactCategory,
        identifier: String,
    },

    /// An archive with known member objects.
    Compound {
        archive: Artifact,
        category: ArtifactCategory,
        identifier: String,
        objects: Vec<Artifact>,
    },
}

impl LibraryToLink {
    pub fn simple(artifact: Artifact, category: ArtifactCategory) -> Self {
        let identifier = library_identifier(&artifact);
        LibraryToLink::Simple {
            artifact,
            category,
            identifier,
        }
    }

    pub fn solib_symlink(symlink: Artifact, original: Artifact, category: ArtifactCategory) -> Self {
        let identifier = library_identifier(&original);
        LibraryToLink::SolibSymlink {
            symlink,
            original,
            category,
            identifier,
        }
    }

    pub fn compound(archive: Artifact, category: ArtifactCategory, objects: Vec<Artifact>) -> Self {
        let identifier = library_identifier(&archive);
        LibraryToLink::Compound {
            archive,
            category,
            identifier,
            objects,
        }
    }

    pub fn category(&self) -> ArtifactCategory {
        match self {
            LibraryToLink::Simple { category, .. }
            | LibraryToLink::SolibSymlink { category, .. }
            | LibraryToLink::Compound { category, .. } => *category,
        }
    }

    /// The file placed on the link line.
    pub fn artifact(&self) -> &Artifact {
        match self {
            LibraryToLink::Simple { artifact, .. } => artifact,
            LibraryToLink::SolibSymlink { symlink, .. } => symlink,
            LibraryToLink::Compound { archive, .. } => archive,
        }
    }

    /// The artifact that gives the library its identity.
    pub fn original_artifact(&self) -> &Artifact {
        match self {
            LibraryToLink::Simple { artifact, .. } => artifact,
            LibraryToLink::SolibSymlink { original, .. } => original,
            LibraryToLink::Compound { archive, .. } => archive,
        }
    }

    pub fn identifier(&self) -> &str {
        match self {
            LibraryToLink::Simple { identifier, .. }
            | LibraryToLink::SolibSymlink { identifier, .. }
            | LibraryToLink::Compound { identifier, .. } => identifier,
        }
    }

    pub fn object_files(&self) -> Option<&[Artifact]> {
        match self {
            LibraryToLink::Compound { objects, .. } => Some(objects),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(
            ArtifactCategory::classify("libx.pic.a"),
            Some(ArtifactCategory::PicStaticLibrary)
        );
        assert_eq!(
            ArtifactCategory::classify("libx.lo"),
            Some(ArtifactCategory::AlwaysLinkStaticLibrary)
        );
        assert_eq!(
            ArtifactCategory::classify("libx.so.1.2"),
            Some(ArtifactCategory::DynamicLibrary)
        );
        assert_eq!(
            ArtifactCategory::classify("libx.dylib"),
            Some(ArtifactCategory::DynamicLibrary)
        );
        assert_eq!(
            ArtifactCategory::classify("x.pic.o"),
            Some(ArtifactCategory::PicObjectFile)
        );
        assert_eq!(ArtifactCategory::classify("libx.so.dbg"), None);
        assert_eq!(ArtifactCategory::classify("x.cc"), None);
    }

    #[test]
    fn test_identifier_ignores_variant_and_root() {
        let source_static = Artifact::source("net/libhttp.a");
        let derived_pic = Artifact::derived("out/bin", "net/libhttp.pic.a");
        let dynamic = Artifact::source("net/libhttp.so");
        let versioned = Artifact::source("net/libhttp.so.2");
        let alwayslink_pic = Artifact::derived("out/bin", "net/libhttp.pic.lo");

        for artifact in [&source_static, &derived_pic, &dynamic, &versioned, &alwayslink_pic] {
            assert_eq!(library_identifier(artifact), "net/libhttp");
        }
    }

    #[test]
    fn test_solib_symlink_identity_is_original() {
        let original = Artifact::source("third_party/libz.so");
        let symlink = Artifact::derived("out/bin", "_solib_k8/libthird_Uparty_Slibz.so");
        let lib = LibraryToLink::solib_symlink(
            symlink.clone(),
            original.clone(),
            ArtifactCategory::DynamicLibrary,
        );
        assert_eq!(lib.artifact(), &symlink);
        assert_eq!(lib.original_artifact(), &original);
        assert_eq!(lib.identifier(), "third_party/libz");
        assert!(lib.object_files().is_none());
    }
}
