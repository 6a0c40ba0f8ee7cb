const fn build_version_or_cargo(opt: Option<&'static str>) -> &'static str {
    match opt {
        Some(val) => val,
        None => env!("CARGO_PKG_VERSION"),
    }
}

/// Release builds stamp `VMTAGS_VERSION`; local builds report the crate version.
pub const VERSION: &str = build_version_or_cargo(option_env!("VMTAGS_VERSION"));
