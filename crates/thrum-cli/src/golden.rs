//! Golden-file runner.
//!
//! Golden files are UTF-8 text of the form
//!
//! ```text
//! @given:  <input>
//! @with:   <optional parameter>
//! @expect: <expected output>
//! ```
//!
//! The runner prints a dot per passing file, a diff block per failure, and
//! a trailing `passed/total` summary; the exit code is zero iff every file
//! passed.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// The three sections of a golden file.
pub struct Golden {
    pub given: String,
    pub with: Option<String>,
    pub expect: String,
}

/// Split a golden file into its sections.
pub fn parse_golden(text: &str) -> Result<Golden, String> {
    let given_at = text
        .find("@given:")
        .ok_or_else(|| "missing @given: section".to_string())?;
    let expect_at = text
        .find("@expect:")
        .ok_or_else(|| "missing @expect: section".to_string())?;
    if expect_at < given_at {
        return Err("@expect: must follow @given:".to_string());
    }

    let with_at = text.find("@with:").filter(|&at| at > given_at && at < expect_at);
    let given_end = with_at.unwrap_or(expect_at);

    let given = text[given_at + "@given:".len()..given_end].trim().to_string();
    let with = with_at
        .map(|at| text[at + "@with:".len()..expect_at].trim().to_string());
    let expect = text[expect_at + "@expect:".len()..].trim().to_string();

    Ok(Golden {
        given,
        with,
        expect,
    })
}

/// Run `check` over every file, reporting progress and the final summary.
pub fn run_files(
    files: &[PathBuf],
    mut check: impl FnMut(&Golden) -> Result<(), String>,
) -> i32 {
    let mut passed = 0usize;

    for path in files {
        let outcome = fs::read_to_string(path)
            .map_err(|error| format!("cannot read file: {error}"))
            .and_then(|text| parse_golden(&text))
            .and_then(|golden| check(&golden));

        match outcome {
            Ok(()) => {
                print!(".");
                let _ = std::io::stdout().flush();
                passed += 1;
            }
            Err(message) => {
                println!("FAILED: {}", path.display());
                println!("{message}");
                println!();
            }
        }
    }

    println!();
    println!("Tests Completed");
    println!("{passed}/{} Passed", files.len());
    if passed == files.len() {
        0
    } else {
        1
    }
}

/// Standard failure text: the expectation and what actually came out.
pub fn diff<T: std::fmt::Display>(expected: &T, actual: &T) -> String {
    format!("Expected:\n{expected}\nbut got:\n{actual}\ninstead")
}
