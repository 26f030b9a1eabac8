//! The external tools a font build runs, and the flags derived for them.

use std::path::Path;

use crate::{ninja::RuleRegistry, Config, Error};

pub const GLYPHS2UFO: &str = "glyphs2ufo";
pub const VARIABLE: &str = "variable";
pub const INSTANCE_UFOS: &str = "instanceufo";
pub const INSTANTIATE_UFO: &str = "instantiateUfo";
pub const BUILD_TTF: &str = "buildttf";
pub const BUILD_OTF: &str = "buildotf";
pub const GEN_STAT: &str = "genstat";
pub const FIX: &str = "fix";
pub const AUTOHINT: &str = "autohint";
pub const WEBFONT: &str = "webfont";
pub const PAINTCOMPILER: &str = "paintcompiler";

/// Register the rules a build needs.
///
/// Variable compilation is only declared when something may use it.
pub fn standard_rules(with_variable: bool) -> Result<RuleRegistry, Error> {
    let mut rules = RuleRegistry::default();
    rules.register(
        GLYPHS2UFO,
        "Convert glyphs file to UFO",
        "fontmake -o ufo -g $in $glyphs2ufo_args",
    )?;
    if with_variable {
        rules.register(
            VARIABLE,
            "Build a variable font from Designspace",
            "fontmake -o variable -m $in $fontmake_args",
        )?;
    }
    rules.register(
        INSTANCE_UFOS,
        "Build a set of instance UFOs from Designspace",
        "fontmake -i -o ufo -m $in $fontmake_args",
    )?;
    rules.register(
        INSTANTIATE_UFO,
        "Build one named instance UFO from Designspace",
        "fontmake -i $instance_name -o ufo -m $in $fontmake_args",
    )?;
    rules.register(
        BUILD_TTF,
        "Build a TTF file from a UFO",
        "fontmake -o ttf -u $in $fontmake_args",
    )?;
    rules.register(
        BUILD_OTF,
        "Build an OTF file from a UFO",
        "fontmake -o otf -u $in $fontmake_args",
    )?;
    rules.register(
        GEN_STAT,
        "Add a STAT table to a set of variable fonts",
        "gftools-gen-stat.py --inplace $other_args --axis-order $axis_order -- $in && touch $out",
    )?;
    rules.register(
        FIX,
        "Run the font fixer in-place and touch a stamp file",
        "gftools-fix-font.py -o $in $fixargs $in && touch $out",
    )?;
    rules.register(
        AUTOHINT,
        "Run ttfautohint in-place and touch a stamp file",
        "ttfautohint $autohint_args $in $in.autohinted && mv $in.autohinted $in && touch $out",
    )?;
    rules.register(
        WEBFONT,
        "Create a web font",
        "fonttools ttLib.woff2 compress -o $out $in",
    )?;
    rules.register(
        PAINTCOMPILER,
        "Run paintcompiler on a font",
        "paintcompiler $paintcompiler_args -o $out $in",
    )?;
    Ok(rules)
}

/// fontmake flags shared by every compile, before output routing
pub fn fontmake_args(config: &Config) -> Vec<String> {
    let mut args = vec!["--filter ...".to_string()];
    if config.flatten_components {
        args.push("--filter FlattenComponentsFilter".to_string());
    }
    if config.decompose_transformed_components {
        args.push("--filter DecomposeTransformedComponentsFilter".to_string());
    }
    if !config.log_level.eq_ignore_ascii_case("WARN") {
        args.push(format!("--verbose {}", config.log_level.to_uppercase()));
    }
    if config.reverse_outline_direction {
        args.push("--keep-direction".to_string());
    }
    if config.remove_outline_overlaps == Some(false) {
        args.push("--keep-overlaps".to_string());
    }
    if config.expand_features_to_instances {
        args.push("--expand-features-to-instances".to_string());
    }
    args
}

/// gftools-fix-font flags
pub fn fix_args(config: &Config) -> Vec<String> {
    let mut args = Vec::new();
    if config.include_source_fixes {
        args.push("--include-source-fixes".to_string());
    }
    if let Some(defaults) = &config.fvar_instance_axis_dflts {
        args.push(format!("--fvar-instance-axis-dflts {}", shell_quote(defaults)));
    }
    args
}

/// Quote for a POSIX shell, unless there's nothing to quote
pub fn shell_quote(value: &str) -> String {
    let safe = |c: char| c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c);
    if !value.is_empty() && value.chars().all(safe) {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r#"'"'"'"#))
}

pub fn quote_path(path: &Path) -> String {
    shell_quote(&path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn variable_rule_is_optional() {
        assert!(standard_rules(true).unwrap().contains(VARIABLE));
        assert!(!standard_rules(false).unwrap().contains(VARIABLE));
        assert!(standard_rules(false).unwrap().contains(FIX));
    }

    #[test]
    fn stamps_are_touched_by_the_rule() {
        let rules = standard_rules(true).unwrap();
        for rule in [GEN_STAT, FIX, AUTOHINT] {
            assert!(
                rules.get(rule).unwrap().command.ends_with("touch $out"),
                "{rule} must produce its stamp"
            );
        }
    }

    #[test]
    fn default_fontmake_args() {
        let config = Config::for_test("sources: [a.glyphs]");
        assert_eq!(
            vec![
                "--filter ...",
                "--filter FlattenComponentsFilter",
                "--filter DecomposeTransformedComponentsFilter",
            ],
            fontmake_args(&config)
        );
    }

    #[test]
    fn every_fontmake_arg() {
        let config = Config::for_test(
            "sources: [a.glyphs]\nflattenComponents: false\nlogLevel: info\n\
             reverseOutlineDirection: true\nremoveOutlineOverlaps: false\n\
             expandFeaturesToInstances: true",
        );
        assert_eq!(
            vec![
                "--filter ...",
                "--filter DecomposeTransformedComponentsFilter",
                "--verbose INFO",
                "--keep-direction",
                "--keep-overlaps",
                "--expand-features-to-instances",
            ],
            fontmake_args(&config)
        );
    }

    #[test]
    fn overlaps_removed_by_default() {
        let config = Config::for_test("sources: [a.glyphs]\nremoveOutlineOverlaps: true");
        assert!(!fontmake_args(&config).contains(&"--keep-overlaps".to_string()));
    }

    #[test]
    fn fix_flags() {
        assert!(fix_args(&Config::for_test("sources: [a.glyphs]")).is_empty());
        let config = Config::for_test(
            "sources: [a.glyphs]\nincludeSourceFixes: true\nfvarInstanceAxisDflts: Semi Bold",
        );
        assert_eq!(
            vec![
                "--include-source-fixes",
                "--fvar-instance-axis-dflts 'Semi Bold'"
            ],
            fix_args(&config)
        );
    }

    #[rstest]
    #[case::plain("../fonts/ttf/Family-Regular.ttf", "../fonts/ttf/Family-Regular.ttf")]
    #[case::axes("fonts/Family[wght].ttf", "'fonts/Family[wght].ttf'")]
    #[case::space("My Fonts/A.ttf", "'My Fonts/A.ttf'")]
    #[case::quote("it's.ttf", r#"'it'"'"'s.ttf'"#)]
    #[case::empty("", "''")]
    fn quoting(#[case] value: &str, #[case] expected: &str) {
        assert_eq!(expected, shell_quote(value));
    }
}
