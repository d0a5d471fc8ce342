//! Well-known feature and action names.
//!
//! Toolchains are free to declare any of these; names a toolchain does not
//! declare are silently ignored during expansion.

pub const PIC: &str = "pic";
pub const SUPPORTS_PIC: &str = "supports_pic";
pub const MODULE_MAPS: &str = "module_maps";
pub const MODULE_MAP_HOME_CWD: &str = "module_map_home_cwd";
pub const HEADER_MODULE_COMPILE: &str = "header_module_compile";
pub const HEADER_MODULES: &str = "header_modules";
pub const PARSE_HEADERS: &str = "parse_headers";
pub const PREPROCESS_HEADERS: &str = "preprocess_headers";
pub const DEPENDENCY_FILE: &str = "dependency_file";
pub const RANDOM_SEED: &str = "random_seed";
pub const INCLUDE_PATHS: &str = "include_paths";
pub const PREPROCESSOR_DEFINES: &str = "preprocessor_defines";
pub const STATIC_LINK_CPP_RUNTIMES: &str = "static_link_cpp_runtimes";

pub const HOST: &str = "host";
pub const NONHOST: &str = "nonhost";
pub const PER_OBJECT_DEBUG_INFO: &str = "per_object_debug_info";

pub const COVERAGE: &str = "coverage";
pub const LLVM_COVERAGE_MAP_FORMAT: &str = "llvm_coverage_map_format";
pub const GCC_COVERAGE_MAP_FORMAT: &str = "gcc_coverage_map_format";

pub const FDO_INSTRUMENT: &str = "fdo_instrument";
pub const FDO_OPTIMIZE: &str = "fdo_optimize";
pub const AUTOFDO: &str = "autofdo";
pub const XBINARYFDO: &str = "xbinaryfdo";
pub const FDO_PREFETCH_HINTS: &str = "fdo_prefetch_hints";
pub const THIN_LTO: &str = "thin_lto";
pub const ENABLE_FDO_THINLTO: &str = "enable_fdo_thinlto";
pub const ENABLE_AFDO_THINLTO: &str = "enable_afdo_thinlto";
pub const ENABLE_XFDO_THINLTO: &str = "enable_xbinaryfdo_thinlto";
pub const LIPO: &str = "lipo";

pub const STATIC_LINK_MSVCRT: &str = "static_link_msvcrt";
pub const STATIC_LINK_MSVCRT_NO_DEBUG: &str = "static_link_msvcrt_no_debug";
pub const STATIC_LINK_MSVCRT_DEBUG: &str = "static_link_msvcrt_debug";
pub const DYNAMIC_LINK_MSVCRT_NO_DEBUG: &str = "dynamic_link_msvcrt_no_debug";
pub const DYNAMIC_LINK_MSVCRT_DEBUG: &str = "dynamic_link_msvcrt_debug";

/// Features requested for every target unless marked unsupported.
pub const DEFAULT_FEATURES: &[&str] = &[
    DEPENDENCY_FILE,
    RANDOM_SEED,
    MODULE_MAPS,
    MODULE_MAP_HOME_CWD,
    HEADER_MODULE_COMPILE,
    INCLUDE_PATHS,
    PIC,
    PREPROCESSOR_DEFINES,
];

pub mod actions {
    pub const C_COMPILE: &str = "c-compile";
    pub const CPP_COMPILE: &str = "c++-compile";
    pub const CPP_HEADER_PARSING: &str = "c++-header-parsing";
    pub const CPP_MODULE_COMPILE: &str = "c++-module-compile";
    pub const ASSEMBLE: &str = "assemble";
    pub const PREPROCESS_ASSEMBLE: &str = "preprocess-assemble";
    pub const LINKSTAMP_COMPILE: &str = "linkstamp-compile";
    pub const LTO_BACKEND: &str = "lto-backend";
    pub const CPP_LINK_EXECUTABLE: &str = "c++-link-executable";
    pub const CPP_LINK_DYNAMIC_LIBRARY: &str = "c++-link-dynamic-library";
    pub const CPP_LINK_NODEPS_DYNAMIC_LIBRARY: &str = "c++-link-nodeps-dynamic-library";
    pub const CPP_LINK_STATIC_LIBRARY: &str = "c++-link-static-library";
    pub const STRIP: &str = "strip";
}

/// Action configs requested for every target.
pub const DEFAULT_ACTION_CONFIGS: &[&str] = &[
    actions::STRIP,
    actions::C_COMPILE,
    actions::CPP_COMPILE,
    actions::CPP_HEADER_PARSING,
    actions::CPP_MODULE_COMPILE,
    actions::ASSEMBLE,
    actions::PREPROCESS_ASSEMBLE,
    actions::LINKSTAMP_COMPILE,
    actions::LTO_BACKEND,
    actions::CPP_LINK_EXECUTABLE,
    actions::CPP_LINK_DYNAMIC_LIBRARY,
    actions::CPP_LINK_NODEPS_DYNAMIC_LIBRARY,
    actions::CPP_LINK_STATIC_LIBRARY,
];
