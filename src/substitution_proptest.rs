//! Property-based tests for the text substitution helpers.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::config::Config;
    use crate::locales::parse_locales;
    use crate::patch::{patch_file, patch_map};
    use crate::template::render;
    use proptest::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn master_config(option: &str, value: &str) -> Config {
        let mut config = Config::new();
        config.set("master", option, value);
        config
    }

    // ============================================================================
    // template property tests
    // ============================================================================

    proptest! {
        /// Property: a line without a complete token is copied unchanged
        #[test]
        fn render_without_tokens_is_identity(line in "[^@\n]*(@[^@\n]*)?\n?") {
            let config = Config::new();
            prop_assert_eq!(render(&config, "master", &line).unwrap(), line);
        }

        /// Property: `X=@OPT@` renders to `X=<value of opt>`
        #[test]
        fn render_substitutes_single_token(
            prefix in "[a-zA-Z_ =:\"]{0,10}",
            option in "[A-Z][A-Z0-9_]{0,10}",
            value in "[a-zA-Z0-9/._-]{0,20}",
        ) {
            let config = master_config(&option.to_ascii_lowercase(), &value);
            let line = format!("{}@{}@", prefix, option);
            prop_assert_eq!(
                render(&config, "master", &line).unwrap(),
                format!("{}{}", prefix, value)
            );
        }

        /// Property: distinct tokens on one line are substituted independently
        #[test]
        fn render_substitutes_tokens_independently(
            first in "[a-z0-9]{1,10}",
            second in "[a-z0-9]{1,10}",
        ) {
            let mut config = Config::new();
            config.set("master", "first", &first);
            config.set("master", "second", &second);
            prop_assert_eq!(
                render(&config, "master", "@FIRST@:@SECOND@:@FIRST@\n").unwrap(),
                format!("{0}:{1}:{0}\n", first, second)
            );
        }
    }

    // ============================================================================
    // locales property tests
    // ============================================================================

    proptest! {
        /// Property: only blank lines and `en-US` are dropped, order is kept
        #[test]
        fn parse_locales_filters_default_and_blank(
            lines in prop::collection::vec(
                prop_oneof![
                    Just("en-US".to_string()),
                    Just(String::new()),
                    "[a-z]{2}(-[A-Z]{2})?",
                ],
                0..20,
            ),
        ) {
            let expected: Vec<String> = lines
                .iter()
                .filter(|line| !line.is_empty() && line.as_str() != "en-US")
                .cloned()
                .collect();
            prop_assert_eq!(parse_locales(&lines.join("\n")), expected);
        }
    }

    // ============================================================================
    // patch_map / patch_file property tests
    // ============================================================================

    proptest! {
        /// Property: the map does not depend on the order of repository names
        #[test]
        fn patch_map_is_order_independent(
            names in prop::collection::vec("[a-z]{1,8}(-[a-z]{1,8})?", 0..6),
            username in "[a-z]{1,8}",
            bug in "[0-9]{1,7}",
        ) {
            let mut reversed = names.clone();
            reversed.reverse();
            prop_assert_eq!(
                patch_map(&names, &username, &bug),
                patch_map(&reversed, &username, &bug)
            );
        }

        /// Property: every plain repository entry maps build/<name> to the user fork
        #[test]
        fn patch_map_user_paths(
            name in "[a-z]{1,8}",
            username in "[a-z]{1,8}",
            bug in "[0-9]{1,7}",
        ) {
            let map = patch_map(&[name.as_str()], &username, &bug);
            let paths = &map[&name];
            prop_assert_eq!(&paths.production, &format!("build/{}", name));
            prop_assert_eq!(
                &paths.user,
                &format!("users/{}_mozilla.com/{}-{}", username, name, bug)
            );
        }

        /// Property: raw-file lines survive patching byte for byte
        #[test]
        fn patch_file_never_touches_raw_file_lines(
            before in "[a-z /]{0,10}",
            after in "[a-z /]{0,10}",
        ) {
            let temp_dir = TempDir::new().unwrap();
            let file = temp_dir.path().join("config.py");
            let raw = format!("{}build/tools/raw-file/{}\n", before, after);
            let plain = format!("{}build/tools{}\n", before, after);
            fs::write(&file, format!("{}{}", raw, plain)).unwrap();

            patch_file(&file, "build/tools", "users/u_mozilla.com/tools-1").unwrap();

            let content = fs::read_to_string(&file).unwrap();
            let mut lines = content.split_inclusive('\n');
            prop_assert_eq!(lines.next(), Some(raw.as_str()));
            prop_assert_eq!(
                lines.next().map(str::to_string),
                Some(plain.replace("build/tools", "users/u_mozilla.com/tools-1"))
            );
        }
    }
}
