//! Compilation and linking output aggregation.
//!
//! One target's attributes plus its dependencies' [`CcInfo`] go in; the
//! merged compilation context, predicted objects, exported libraries, and
//! runfiles come out. Attribute problems are collected with defaults
//! substituted so a single pass surfaces all of them. Only scheduling
//! conflicts abort aggregation.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::builder::actions::{Action, ActionRegistry};
use crate::builder::compilation::{
    extend_last_wins, extend_unique, push_unique, CompilationContext, ModuleMapRef,
};
use crate::builder::linking::{solib_symlink_path, LinkMode, LinkingOutputs, Runfiles, RunfilesPair};
use crate::builder::module_map::{render_module_map, ModuleMapContents, ModuleMapOptions};
use crate::core::artifact::Artifact;
use crate::core::configuration::BuildConfiguration;
use crate::core::errors::{AnalysisError, ErrorCollector};
use crate::core::label::Label;
use crate::core::library::{ArtifactCategory, LibraryToLink};
use crate::core::target::{HeadersCheckingMode, LinkTargetType, TargetAttributes};
use crate::core::toolchain::ToolchainDescriptor;
use crate::features::{names, FeatureConfiguration};
use crate::util::paths::{normalize_relative, to_slash};
use crate::util::tokenize::tokenize;

const HEADER_EXTENSIONS: &[&str] = &["h", "hh", "hpp", "hxx", "h++", "inc", "inl", "ipp", "tcc", "H"];
const C_EXTENSIONS: &[&str] = &["c"];
const CXX_EXTENSIONS: &[&str] = &["cc", "cpp", "cxx", "c++", "C"];
const ASM_EXTENSIONS: &[&str] = &["s", "S", "asm"];

/// What a C/C++ dependency exposes to its dependents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CcInfo {
    pub compilation_context: CompilationContext,
    pub linking_outputs: Option<LinkingOutputs>,
}

/// One entry of a target's `deps`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub label: Label,

    /// The dependency claims to be a C/C++ target
    #[serde(default)]
    pub is_cc: bool,

    #[serde(default)]
    pub cc_info: Option<CcInfo>,

    #[serde(default)]
    pub runfiles: Runfiles,
}

impl Dependency {
    pub fn cc(label: Label, cc_info: CcInfo) -> Self {
        Dependency {
            label,
            is_cc: true,
            cc_info: Some(cc_info),
            runfiles: Runfiles::new(),
        }
    }

    /// A dependency of another language or rule kind.
    pub fn opaque(label: Label) -> Self {
        Dependency {
            label,
            is_cc: false,
            cc_info: None,
            runfiles: Runfiles::new(),
        }
    }

    pub fn with_runfiles(mut self, runfiles: Runfiles) -> Self {
        self.runfiles = runfiles;
        self
    }
}

/// Object files compilation will produce.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationOutputs {
    pub objects: Vec<Artifact>,
    pub pic_objects: Vec<Artifact>,
}

impl CompilationOutputs {
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.pic_objects.is_empty()
    }
}

/// Everything aggregation needs, already resolved.
#[derive(Debug, Clone, Copy)]
pub struct AggregationRequest<'a> {
    pub target: &'a TargetAttributes,
    pub deps: &'a [Dependency],
    pub toolchain: &'a ToolchainDescriptor,
    pub config: &'a BuildConfiguration,
    pub features: &'a FeatureConfiguration,
}

/// Result of aggregating one target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Aggregation {
    pub compilation_context: CompilationContext,
    pub compilation_outputs: CompilationOutputs,
    /// Tokenized copts after `nocopts` filtering
    pub copts: Vec<String>,
    /// Libraries exported to dependents, own first
    pub linking_outputs: LinkingOutputs,
    /// Libraries and binaries this target declares
    pub outputs: Vec<Artifact>,
    pub runfiles: RunfilesPair,
}

impl Aggregation {
    pub fn cc_info(&self) -> CcInfo {
        CcInfo {
            compilation_context: self.compilation_context.clone(),
            linking_outputs: Some(self.linking_outputs.clone()),
        }
    }
}

/// Fail if a dependency claims to be C/C++ but supplies no [`CcInfo`].
pub fn check_dependencies(
    target: &TargetAttributes,
    deps: &[Dependency],
) -> Result<(), AnalysisError> {
    if !target.check_deps_provider {
        return Ok(());
    }
    for dep in deps {
        if dep.is_cc && dep.cc_info.is_none() {
            return Err(AnalysisError::attribute(
                &target.label,
                "deps",
                format!(
                    "`{}` is declared as a C/C++ dependency but does not provide compilation information",
                    dep.label
                ),
            ));
        }
    }
    Ok(())
}

/// Sources split by role.
#[derive(Debug, Default)]
struct Sources<'a> {
    compiled: Vec<&'a Artifact>,
    private_headers: Vec<&'a Artifact>,
    objects: Vec<Artifact>,
    pic_objects: Vec<Artifact>,
    libraries: Vec<(&'a Artifact, ArtifactCategory)>,
}

fn extension(artifact: &Artifact) -> Option<&str> {
    artifact.exec_path().extension().and_then(|e| e.to_str())
}

fn classify_sources<'a>(target: &'a TargetAttributes, errors: &mut ErrorCollector) -> Sources<'a> {
    let mut sources = Sources::default();
    for src in &target.srcs {
        if let Some(category) = ArtifactCategory::classify(&src.basename()) {
            match category {
                ArtifactCategory::ObjectFile => sources.objects.push(src.clone()),
                ArtifactCategory::PicObjectFile => sources.pic_objects.push(src.clone()),
                _ => sources.libraries.push((src, category)),
            }
            continue;
        }
        match extension(src) {
            Some(ext) if HEADER_EXTENSIONS.contains(&ext) => sources.private_headers.push(src),
            Some(ext)
                if C_EXTENSIONS.contains(&ext)
                    || CXX_EXTENSIONS.contains(&ext)
                    || ASM_EXTENSIONS.contains(&ext) =>
            {
                sources.compiled.push(src)
            }
            _ => errors.push(AnalysisError::attribute(
                &target.label,
                "srcs",
                format!(
                    "source file `{}` is misplaced here (expected a C/C++ source, header, object, or library)",
                    to_slash(src.exec_path())
                ),
            )),
        }
    }
    sources
}

fn tokenize_all(
    label: &Label,
    attribute: &str,
    values: &[String],
    errors: &mut ErrorCollector,
) -> Vec<String> {
    let mut tokens = Vec::new();
    for value in values {
        match tokenize(value) {
            Ok(words) => tokens.extend(words),
            Err(e) => errors.push(AnalysisError::attribute(label, attribute, e.to_string())),
        }
    }
    tokens
}

/// `defines` entries must each be exactly one token.
fn local_defines(target: &TargetAttributes, errors: &mut ErrorCollector) -> Vec<String> {
    let mut defines = Vec::new();
    for value in &target.defines {
        match tokenize(value) {
            Ok(mut words) if words.len() == 1 => defines.append(&mut words),
            Ok(words) => errors.push(AnalysisError::attribute(
                &target.label,
                "defines",
                format!(
                    "each entry must be a single token, but `{}` has {}",
                    value,
                    words.len()
                ),
            )),
            Err(e) => errors.push(AnalysisError::attribute(&target.label, "defines", e.to_string())),
        }
    }
    defines
}

/// Resolve a package-relative directory against the execution root.
fn package_dir(
    label: &Label,
    attribute: &str,
    dir: &Path,
    errors: &mut ErrorCollector,
) -> Option<PathBuf> {
    match normalize_relative(&label.package_path().join(dir)) {
        Some(path) if path.as_os_str().is_empty() => Some(PathBuf::from(".")),
        Some(path) => Some(path),
        None => {
            errors.push(AnalysisError::attribute(
                label,
                attribute,
                format!(
                    "path `{}` references a directory outside the execution root",
                    to_slash(dir)
                ),
            ));
            None
        }
    }
}

/// Tokenized copts with `nocopts` applied and `-I<dir>` entries lifted into
/// include directories.
fn user_compile_flags(
    target: &TargetAttributes,
    errors: &mut ErrorCollector,
) -> (Vec<String>, Vec<PathBuf>) {
    let label = &target.label;
    let tokens = tokenize_all(label, "copts", &target.copts, errors);

    let filter = match &target.nocopts {
        Some(pattern) => match Regex::new(pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                errors.push(AnalysisError::attribute(
                    label,
                    "nocopts",
                    format!("invalid regular expression `{}`: {}", pattern, e),
                ));
                None
            }
        },
        None => None,
    };

    let mut copts = Vec::new();
    let mut include_dirs = Vec::new();
    for token in tokens {
        if filter.as_ref().is_some_and(|re| re.is_match(&token)) {
            tracing::trace!("nocopts removed `{}` from {}", token, label);
            continue;
        }
        match token.strip_prefix("-I") {
            Some(dir) if !dir.is_empty() && !Path::new(dir).is_absolute() => {
                if let Some(path) = package_dir(label, "copts", Path::new(dir), errors) {
                    push_unique(&mut include_dirs, path);
                }
            }
            _ => copts.push(token),
        }
    }
    (copts, include_dirs)
}

fn exec_root_variant(path: &Path) -> PathBuf {
    if path.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        path.to_path_buf()
    }
}

fn compilation_context(
    request: &AggregationRequest<'_>,
    sources: &Sources<'_>,
    include_dirs: Vec<PathBuf>,
    actions: &mut ActionRegistry,
    errors: &mut ErrorCollector,
) -> Result<CompilationContext, AnalysisError> {
    let target = request.target;
    let label = &target.label;
    let genfiles = request.config.genfiles_dir();
    let repository = label.repository_path();

    let mut ctx = CompilationContext {
        quote_include_dirs: vec![exec_root_variant(&repository), genfiles.join(&repository)],
        include_dirs,
        ..Default::default()
    };

    for entry in &target.includes {
        if let Some(dir) = package_dir(label, "includes", Path::new(entry), errors) {
            push_unique(&mut ctx.system_include_dirs, dir.clone());
            push_unique(&mut ctx.system_include_dirs, genfiles.join(dir));
        }
    }

    let dep_contexts: Vec<&CompilationContext> = request
        .deps
        .iter()
        .filter_map(|d| d.cc_info.as_ref())
        .map(|info| &info.compilation_context)
        .collect();
    for dep in &dep_contexts {
        ctx.merge_dependency(dep);
    }

    let toolchain = request.toolchain;
    extend_unique(&mut ctx.builtin_include_dirs, &toolchain.builtin_include_directories);
    for header in &toolchain.headers {
        let header = Artifact::source(header);
        push_unique(&mut ctx.declared_include_srcs, header.clone());
        push_unique(&mut ctx.compilation_prerequisites, header);
    }

    extend_last_wins(&mut ctx.defines, &local_defines(target, errors));

    let local_headers = target
        .hdrs
        .iter()
        .chain(&target.private_hdrs)
        .chain(sources.private_headers.iter().copied())
        .chain(&target.textual_hdrs);
    for header in local_headers {
        push_unique(&mut ctx.declared_include_srcs, header.clone());
        push_unique(&mut ctx.compilation_prerequisites, header.clone());
    }

    match target.headers_checking_mode {
        HeadersCheckingMode::Strict => {}
        HeadersCheckingMode::Loose | HeadersCheckingMode::Warn => {
            push_unique(
                &mut ctx.declared_include_dirs,
                exec_root_variant(&label.package_path()),
            );
            for dir in &target.loose_include_dirs {
                if let Some(dir) = package_dir(label, "loose_include_dirs", dir, errors) {
                    push_unique(&mut ctx.declared_include_dirs, dir);
                }
            }
        }
    }

    if request.features.is_enabled(names::MODULE_MAPS) && target.generate_module_map {
        let file = Artifact::derived(
            request.config.bin_dir(),
            label.package_path().join(format!("{}.cppmap", label.name())),
        );
        let map = ModuleMapRef {
            name: label.to_string(),
            file,
        };

        let private_headers: Vec<&Artifact> = target
            .private_hdrs
            .iter()
            .chain(sources.private_headers.iter().copied())
            .collect();
        let contents = ModuleMapContents {
            public_headers: target.hdrs.iter().collect(),
            private_headers,
            textual_headers: target.textual_hdrs.iter().collect(),
            additional_exported_headers: target
                .additional_exported_hdrs
                .iter()
                .map(PathBuf::as_path)
                .collect(),
            dependencies: dep_contexts
                .iter()
                .filter_map(|c| c.module_map.as_ref())
                .collect(),
        };
        let options = ModuleMapOptions {
            compiled_module: request.features.is_enabled(names::HEADER_MODULE_COMPILE),
            home_cwd: request.features.is_enabled(names::MODULE_MAP_HOME_CWD),
        };

        let text = render_module_map(&map, &contents, options);
        let file = actions
            .register(Action::WriteModuleMap {
                output: map.file.clone(),
                contents: text,
            })
            .map_err(|c| c.into_analysis_error(&toolchain.identifier))?;
        push_unique(&mut ctx.compilation_prerequisites, file);
        ctx.module_map = Some(map);
    }

    Ok(ctx)
}

/// Predicted object path under `_objs/<name>/`, keeping the source's
/// package-relative directory structure.
fn object_path(label: &Label, src: &Artifact, suffix: &str) -> PathBuf {
    let package = label.package_path();
    let relative = src
        .exec_path()
        .strip_prefix(&package)
        .ok()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(src.basename()));
    let stem = to_slash(&relative.with_extension(""));
    package
        .join("_objs")
        .join(label.name())
        .join(format!("{}{}", stem, suffix))
}

fn register_solib_symlink(
    request: &AggregationRequest<'_>,
    library: &Artifact,
    category: ArtifactCategory,
    actions: &mut ActionRegistry,
) -> Result<LibraryToLink, AnalysisError> {
    let symlink = Artifact::derived(
        request.config.bin_dir(),
        solib_symlink_path(&request.toolchain.target_cpu, library),
    );
    let symlink = actions
        .register(Action::SolibSymlink {
            input: library.clone(),
            output: symlink,
        })
        .map_err(|c| c.into_analysis_error(&request.toolchain.identifier))?;
    Ok(LibraryToLink::solib_symlink(symlink, library.clone(), category))
}

/// Aggregate one target.
///
/// Attribute errors go to `errors`; the returned error is reserved for
/// conflicts that make the result meaningless.
pub fn aggregate(
    request: &AggregationRequest<'_>,
    actions: &mut ActionRegistry,
    errors: &mut ErrorCollector,
) -> Result<Aggregation, AnalysisError> {
    let target = request.target;
    let label = &target.label;
    let bin = request.config.bin_dir();
    let package = label.package_path();

    let sources = classify_sources(target, errors);
    let (copts, include_dirs) = user_compile_flags(target, errors);
    let linkopts = tokenize_all(label, "linkopts", &target.linkopts, errors);

    let compilation_context =
        compilation_context(request, &sources, include_dirs, actions, errors)?;

    let link_type = target.effective_link_type();
    let pic_enabled = request.features.is_enabled(names::PIC);
    let pic_forced = request.config.force_pic
        || request.toolchain.capabilities.needs_pic
        || link_type.requires_pic();
    let produce_pic = pic_enabled;
    let produce_nopic = !pic_enabled || !pic_forced;
    tracing::debug!(
        "{}: link type {}, pic objects {}, non-pic objects {}",
        label,
        link_type,
        produce_pic,
        produce_nopic
    );

    let mut outputs = CompilationOutputs::default();
    for src in &sources.compiled {
        if produce_nopic {
            outputs
                .objects
                .push(Artifact::derived(&bin, object_path(label, src, ".o")));
        }
        if produce_pic {
            outputs
                .pic_objects
                .push(Artifact::derived(&bin, object_path(label, src, ".pic.o")));
        }
    }
    extend_unique(&mut outputs.objects, &sources.objects);
    extend_unique(&mut outputs.pic_objects, &sources.pic_objects);

    let mut declared = Vec::new();
    let mut own_libraries = Vec::new();

    if link_type.is_static_library() {
        let alwayslink = link_type.is_alwayslink();
        let pic_only = link_type.requires_pic();
        if !outputs.objects.is_empty() && !pic_only {
            let (suffix, category) = if alwayslink {
                (".lo", ArtifactCategory::AlwaysLinkStaticLibrary)
            } else {
                (".a", ArtifactCategory::StaticLibrary)
            };
            let archive = Artifact::derived(
                &bin,
                package.join(format!("lib{}{}", label.name(), suffix)),
            );
            declared.push(archive.clone());
            own_libraries.push(LibraryToLink::compound(
                archive,
                category,
                outputs.objects.clone(),
            ));
        }
        if !outputs.pic_objects.is_empty() {
            let (suffix, category) = if alwayslink {
                (".pic.lo", ArtifactCategory::AlwaysLinkPicStaticLibrary)
            } else {
                (".pic.a", ArtifactCategory::PicStaticLibrary)
            };
            let archive = Artifact::derived(
                &bin,
                package.join(format!("lib{}{}", label.name(), suffix)),
            );
            declared.push(archive.clone());
            own_libraries.push(LibraryToLink::compound(
                archive,
                category,
                outputs.pic_objects.clone(),
            ));
        }
    } else if link_type.is_dynamic_library() {
        let shared = Artifact::derived(&bin, package.join(format!("lib{}.so", label.name())));
        declared.push(shared.clone());
        if link_type == LinkTargetType::DynamicLibrary
            && request.toolchain.capabilities.supports_interface_shared_libraries
        {
            declared.push(Artifact::derived(
                &bin,
                package.join(format!("lib{}.ifso", label.name())),
            ));
        }
        own_libraries.push(register_solib_symlink(
            request,
            &shared,
            ArtifactCategory::DynamicLibrary,
            actions,
        )?);
    } else {
        declared.push(Artifact::derived(&bin, package.join(label.name())));
    }

    for (library, category) in &sources.libraries {
        let library = if category.is_dynamic() {
            register_solib_symlink(request, library, *category, actions)?
        } else {
            LibraryToLink::simple((*library).clone(), *category)
        };
        own_libraries.push(library);
    }

    let mut linking_outputs = LinkingOutputs::new();
    if target.neverlink {
        tracing::debug!("{} is neverlink; not exporting its own libraries", label);
    } else {
        for library in own_libraries {
            linking_outputs.add(library);
        }
        linking_outputs.add_linkopts(label.to_string(), linkopts);
    }
    for dep in request.deps {
        if let Some(dep_outputs) = dep.cc_info.as_ref().and_then(|i| i.linking_outputs.as_ref()) {
            linking_outputs.merge(dep_outputs);
        }
    }

    let mut dep_runfiles = Runfiles::new();
    for dep in request.deps {
        dep_runfiles.merge(&dep.runfiles);
    }
    let mut runfiles = RunfilesPair {
        static_mode: dep_runfiles.clone(),
        dynamic_mode: dep_runfiles,
    };
    runfiles
        .static_mode
        .merge(&linking_outputs.runtime_libraries(LinkMode::Static, pic_enabled));
    runfiles
        .dynamic_mode
        .merge(&linking_outputs.runtime_libraries(LinkMode::Dynamic, pic_enabled));

    Ok(Aggregation {
        compilation_context,
        compilation_outputs: outputs,
        copts,
        linking_outputs,
        outputs: declared,
        runfiles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::core::errors::ErrorKind;
    use crate::features::{resolve_features, FeatureGraph, FeatureRequest};
    use crate::test_support::fixtures::{cc_dep, feature, label, paths, target, toolchain};

    fn features(tc: &ToolchainDescriptor) -> FeatureConfiguration {
        let graph = Arc::new(FeatureGraph::build(tc).unwrap());
        resolve_features(tc, &graph, &FeatureRequest::default()).unwrap()
    }

    fn run(
        target: &TargetAttributes,
        deps: &[Dependency],
        tc: &ToolchainDescriptor,
    ) -> (Aggregation, Vec<AnalysisError>, ActionRegistry) {
        let config = BuildConfiguration::default();
        let features = features(tc);
        let request = AggregationRequest {
            target,
            deps,
            toolchain: tc,
            config: &config,
            features: &features,
        };
        let mut actions = ActionRegistry::new();
        let mut errors = ErrorCollector::new();
        let result = aggregate(&request, &mut actions, &mut errors).unwrap();
        (result, errors.into_errors(), actions)
    }

    #[test]
    fn test_quote_include_order() {
        let t = target("//net:http");
        let (agg, errors, _) = run(&t, &[], &toolchain("k8"));
        assert!(errors.is_empty());
        assert_eq!(
            agg.compilation_context.quote_include_dirs,
            paths(&[".", "out/genfiles"])
        );

        let t = target("@zlib//:zlib");
        let (agg, _, _) = run(&t, &[], &toolchain("k8"));
        assert_eq!(
            agg.compilation_context.quote_include_dirs,
            paths(&["external/zlib", "out/genfiles/external/zlib"])
        );
    }

    #[test]
    fn test_headers_checking_modes() {
        let mut t = target("//net:http");
        t.hdrs = vec![Artifact::source("net/http.h")];
        t.loose_include_dirs = paths(&["internal"]);

        let (agg, _, _) = run(&t, &[], &toolchain("k8"));
        assert!(agg.compilation_context.declared_include_dirs.is_empty());
        assert_eq!(
            agg.compilation_context.declared_include_srcs,
            vec![Artifact::source("net/http.h")]
        );

        for mode in [HeadersCheckingMode::Loose, HeadersCheckingMode::Warn] {
            t.headers_checking_mode = mode;
            let (agg, _, _) = run(&t, &[], &toolchain("k8"));
            assert_eq!(
                agg.compilation_context.declared_include_dirs,
                paths(&["net", "net/internal"])
            );
        }
    }

    #[test]
    fn test_dependency_context_precedes_local_defines() {
        let dep_ctx = CompilationContext {
            defines: vec!["BASE=1".into()],
            system_include_dirs: paths(&["base/include"]),
            ..Default::default()
        };
        let deps = [cc_dep("//base:base", dep_ctx, None)];
        let mut t = target("//net:http");
        t.defines = vec!["HTTP=1".into()];
        t.includes = vec!["include".into()];

        let mut tc = toolchain("k8");
        tc.builtin_include_directories = paths(&["/usr/include"]);
        tc.headers = paths(&["toolchain/include/stddef.h"]);

        let (agg, errors, _) = run(&t, &deps, &tc);
        assert!(errors.is_empty());
        let ctx = &agg.compilation_context;
        assert_eq!(ctx.defines, vec!["BASE=1", "HTTP=1"]);
        assert_eq!(
            ctx.system_include_dirs,
            paths(&["net/include", "out/genfiles/net/include", "base/include"])
        );
        assert_eq!(ctx.builtin_include_dirs, paths(&["/usr/include"]));
        assert!(ctx
            .declared_include_srcs
            .contains(&Artifact::source("toolchain/include/stddef.h")));
    }

    #[test]
    fn test_local_define_overrides_inherited_redefinition() {
        let dep_ctx = CompilationContext {
            defines: vec!["LEVEL=1".into(), "LEVEL=2".into()],
            ..Default::default()
        };
        let deps = [cc_dep("//base:base", dep_ctx, None)];
        let mut t = target("//net:http");
        t.defines = vec!["LEVEL=1".into()];

        let (agg, errors, _) = run(&t, &deps, &toolchain("k8"));
        assert!(errors.is_empty());
        let defines = &agg.compilation_context.defines;
        assert_eq!(defines, &vec!["LEVEL=2", "LEVEL=1"]);
        assert_eq!(defines.last().map(String::as_str), Some("LEVEL=1"));
    }

    #[test]
    fn test_attribute_errors_are_collected() {
        let mut t = target("//net:http");
        t.defines = vec!["A=1 B=2".into(), "".into(), "OK".into()];
        t.includes = vec!["../../escape".into()];
        t.nocopts = Some("(".into());
        t.copts = vec!["-O2 -Wall".into(), "\"unterminated".into()];

        let (agg, errors, _) = run(&t, &[], &toolchain("k8"));
        let attributes: Vec<&str> = errors
            .iter()
            .map(|e| match e {
                AnalysisError::Attribute { attribute, .. } => attribute.as_str(),
                _ => "",
            })
            .collect();
        assert!(errors.iter().all(|e| e.kind() == ErrorKind::Attribute));
        assert_eq!(
            attributes,
            vec!["copts", "nocopts", "includes", "defines", "defines"]
        );
        assert_eq!(agg.compilation_context.defines, vec!["OK"]);
        assert_eq!(agg.copts, vec!["-O2", "-Wall"]);
    }

    #[test]
    fn test_nocopts_and_include_flags() {
        let mut t = target("//net:http");
        t.copts = vec!["-Werror -Wall -Ithird_party -I/abs".into()];
        t.nocopts = Some("^-Werror$".into());

        let (agg, errors, _) = run(&t, &[], &toolchain("k8"));
        assert!(errors.is_empty());
        assert_eq!(agg.copts, vec!["-Wall", "-I/abs"]);
        assert_eq!(
            agg.compilation_context.include_dirs,
            paths(&["net/third_party"])
        );
    }

    #[test]
    fn test_static_library_objects_and_archive() {
        let mut t = target("//net:http");
        t.srcs = vec![
            Artifact::source("net/http.cc"),
            Artifact::source("net/impl/parser.c"),
            Artifact::source("net/internal.h"),
            Artifact::source("net/prebuilt.o"),
        ];

        let (agg, errors, _) = run(&t, &[], &toolchain("k8"));
        assert!(errors.is_empty());
        assert_eq!(
            agg.compilation_outputs.objects,
            vec![
                Artifact::derived("out/bin", "net/_objs/http/http.o"),
                Artifact::derived("out/bin", "net/_objs/http/impl/parser.o"),
                Artifact::source("net/prebuilt.o"),
            ]
        );
        assert!(agg.compilation_outputs.pic_objects.is_empty());
        assert_eq!(
            agg.outputs,
            vec![Artifact::derived("out/bin", "net/libhttp.a")]
        );
        let archive = &agg.linking_outputs.static_libraries[0];
        assert_eq!(archive.identifier(), "net/libhttp");
        assert_eq!(archive.object_files().map(|o| o.len()), Some(3));
        assert!(agg
            .compilation_context
            .declared_include_srcs
            .contains(&Artifact::source("net/internal.h")));
    }

    #[test]
    fn test_pic_objects_when_pic_enabled() {
        let mut tc = toolchain("k8");
        tc.features = vec![feature("pic").build()];
        let mut t = target("//net:http");
        t.srcs = vec![Artifact::source("net/http.cc")];
        t.alwayslink = true;

        let (agg, _, _) = run(&t, &[], &tc);
        assert_eq!(agg.compilation_outputs.objects.len(), 1);
        assert_eq!(agg.compilation_outputs.pic_objects.len(), 1);
        assert_eq!(
            agg.outputs,
            vec![
                Artifact::derived("out/bin", "net/libhttp.lo"),
                Artifact::derived("out/bin", "net/libhttp.pic.lo"),
            ]
        );

        t.link_type = LinkTargetType::PicStaticLibrary;
        let (agg, _, _) = run(&t, &[], &tc);
        assert!(agg.compilation_outputs.objects.is_empty());
        assert_eq!(
            agg.outputs,
            vec![Artifact::derived("out/bin", "net/libhttp.pic.lo")]
        );
    }

    #[test]
    fn test_direct_and_transitive_library_collapse() {
        let lib = Artifact::source("third_party/ssl/libssl.a");
        let mut dep_outputs = LinkingOutputs::new();
        dep_outputs.add(LibraryToLink::simple(lib.clone(), ArtifactCategory::StaticLibrary));
        let deps = [cc_dep("//third_party/ssl:ssl", Default::default(), Some(dep_outputs))];

        let mut t = target("//net:http");
        t.srcs = vec![lib];
        let (agg, _, _) = run(&t, &deps, &toolchain("k8"));

        let line = agg.linking_outputs.link_line(LinkMode::Static, false);
        assert_eq!(line.len(), 1);
        assert_eq!(line[0].identifier(), "third_party/ssl/libssl");
    }

    #[test]
    fn test_precompiled_shared_library_runfiles() {
        let so = Artifact::source("third_party/ssl/libssl.so.1");
        let dep_runfiles: Runfiles = [Artifact::source("data/certs.pem")].into_iter().collect();
        let deps = [Dependency::opaque(label("//data:certs")).with_runfiles(dep_runfiles)];
        let mut t = target("//net:http");
        t.srcs = vec![so.clone()];

        let (agg, _, actions) = run(&t, &deps, &toolchain("k8"));
        let symlink = Artifact::derived(
            "out/bin",
            "_solib_k8/libthird_Uparty_Sssl_Slibssl.so.1",
        );
        assert_eq!(agg.linking_outputs.dynamic_libraries[0].artifact(), &symlink);
        assert!(actions.producer(symlink.exec_path()).is_some());

        let dynamic = &agg.runfiles.dynamic_mode;
        assert!(dynamic.contains(&so));
        assert!(dynamic.contains(&symlink));
        assert!(dynamic.contains(&Artifact::source("data/certs.pem")));
        assert!(agg.runfiles.static_mode.contains(&so));
    }

    #[test]
    fn test_neverlink_exports_only_dependencies() {
        let mut dep_outputs = LinkingOutputs::new();
        dep_outputs.add(LibraryToLink::simple(
            Artifact::source("base/libbase.a"),
            ArtifactCategory::StaticLibrary,
        ));
        let deps = [cc_dep("//base:base", Default::default(), Some(dep_outputs))];
        let mut t = target("//net:http");
        t.srcs = vec![Artifact::source("net/http.cc")];
        t.linkopts = vec!["-lm".into()];
        t.neverlink = true;

        let (agg, _, _) = run(&t, &deps, &toolchain("k8"));
        assert_eq!(agg.linking_outputs.identifiers(), vec!["base/libbase"]);
        assert!(agg.linking_outputs.linkopts.is_empty());
        assert_eq!(agg.outputs.len(), 1);
    }

    #[test]
    fn test_dynamic_library_outputs() {
        let mut tc = toolchain("k8");
        tc.features = vec![feature("pic").build()];
        tc.capabilities.supports_interface_shared_libraries = true;
        let mut t = target("//net:http");
        t.srcs = vec![Artifact::source("net/http.cc")];
        t.link_type = LinkTargetType::DynamicLibrary;

        let (agg, _, _) = run(&t, &[], &tc);
        assert!(agg.compilation_outputs.objects.is_empty());
        assert_eq!(
            agg.outputs,
            vec![
                Artifact::derived("out/bin", "net/libhttp.so"),
                Artifact::derived("out/bin", "net/libhttp.ifso"),
            ]
        );
        assert_eq!(agg.linking_outputs.identifiers(), vec!["net/libhttp"]);
    }

    #[test]
    fn test_module_map_generation() {
        let mut tc = toolchain("k8");
        tc.features = vec![feature("module_maps").build()];
        tc.default_features = vec!["module_maps".into()];
        let dep_map = ModuleMapRef {
            name: "//base:base".into(),
            file: Artifact::derived("out/bin", "base/base.cppmap"),
        };
        let dep_ctx = CompilationContext {
            module_map: Some(dep_map.clone()),
            ..Default::default()
        };
        let deps = [cc_dep("//base:base", dep_ctx, None)];
        let mut t = target("//net:http");
        t.hdrs = vec![Artifact::source("net/http.h")];

        let (agg, _, actions) = run(&t, &deps, &tc);
        let map = agg.compilation_context.module_map.clone().unwrap();
        assert_eq!(map.name, "//net:http");
        assert_eq!(map.file, Artifact::derived("out/bin", "net/http.cppmap"));
        assert_eq!(agg.compilation_context.transitive_module_maps, vec![dep_map]);

        match actions.producer(map.file.exec_path()) {
            Some(Action::WriteModuleMap { contents, .. }) => {
                assert!(contents.contains("use \"//base:base\""));
                assert!(contents.contains("textual header \"../../../net/http.h\""));
            }
            other => panic!("unexpected producer: {:?}", other),
        }

        t.generate_module_map = false;
        let (agg, _, actions) = run(&t, &deps, &tc);
        assert!(agg.compilation_context.module_map.is_none());
        assert!(actions.is_empty());
    }

    #[test]
    fn test_check_dependencies() {
        let mut t = target("//app:main");
        let deps = [Dependency {
            label: label("//gen:proto"),
            is_cc: true,
            cc_info: None,
            runfiles: Runfiles::new(),
        }];

        let err = check_dependencies(&t, &deps).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Attribute);
        assert!(err.message().contains("//gen:proto"));

        t.check_deps_provider = false;
        assert!(check_dependencies(&t, &deps).is_ok());
        assert!(check_dependencies(&target("//app:main"), &[Dependency::opaque(label("//x:y"))]).is_ok());
    }
}
