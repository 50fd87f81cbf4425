//! Shell completion generation for zeto
//!
//! Generates completion scripts for bash, zsh and fish. The bash and zsh
//! scripts additionally complete collection names for the paging commands
//! from the fixture file named on the command line, if any.

use clap::CommandFactory;
use clap_complete::{Shell, generate};

use crate::cli::CliArgs;
use crate::error::{ConfigError, Result, ZetoError};

const BIN: &str = "zeto";

/// Generate the completion script for `shell_name`
///
/// # Arguments
/// * `shell_name` - Shell type (bash, zsh, fish)
pub fn generate_completion(shell_name: &str) -> Result<String> {
    let shell = parse_shell(shell_name)?;
    let basic = basic_completion(shell);

    Ok(match shell {
        Shell::Bash => format!("{basic}{BASH_COLLECTIONS}"),
        Shell::Zsh => format!("{basic}{ZSH_COLLECTIONS}"),
        _ => basic,
    })
}

/// Parse shell name string to Shell enum
fn parse_shell(shell_name: &str) -> Result<Shell> {
    match shell_name.to_lowercase().as_str() {
        "bash" => Ok(Shell::Bash),
        "zsh" => Ok(Shell::Zsh),
        "fish" => Ok(Shell::Fish),
        _ => Err(ZetoError::Config(ConfigError::InvalidValue {
            field: "shell".to_string(),
            value: format!("{shell_name} (supported: bash, zsh, fish)"),
        })),
    }
}

fn basic_completion(shell: Shell) -> String {
    let mut cmd = CliArgs::command();
    let mut buffer = Vec::new();
    generate(shell, &mut cmd, BIN, &mut buffer);
    String::from_utf8_lossy(&buffer).into_owned()
}

const BASH_COLLECTIONS: &str = r#"
# Collection names from the --fixture file
_zeto_fixture_collections() {
    local fixture="$1"
    [ -f "$fixture" ] || return
    grep -o '^  "[^"]*": \[' "$fixture" | sed 's/^  "\(.*\)": \[/\1/'
}

_zeto_enhanced() {
    local cur prev words cword
    _init_completion || return

    local i fixture
    for ((i = 1; i < cword; i++)); do
        if [[ "${words[i]}" == "--fixture" ]]; then
            fixture="${words[i+1]}"
        fi
    done

    case "$prev" in
        page|scroll|browse|seed)
            if [ -n "$fixture" ]; then
                COMPREPLY=($(compgen -W "$(_zeto_fixture_collections "$fixture")" -- "$cur"))
                return 0
            fi
            ;;
    esac

    _zeto "$@"
}

complete -F _zeto_enhanced zeto
"#;

const ZSH_COLLECTIONS: &str = r#"
# Collection names from the --fixture file
_zeto_fixture_collections() {
    local fixture="$1"
    [[ -f "$fixture" ]] || return
    grep -o '^  "[^"]*": \[' "$fixture" | sed 's/^  "\(.*\)": \[/\1/'
}

_zeto_enhanced() {
    local fixture=${words[(I)--fixture]}
    if (( fixture > 0 )) && [[ ${words[CURRENT-1]} == (page|scroll|browse|seed) ]]; then
        local -a collections
        collections=($(_zeto_fixture_collections "${words[fixture+1]}"))
        _describe 'collections' collections
        return 0
    fi

    _zeto "$@"
}

compdef _zeto_enhanced zeto
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shell() {
        assert!(matches!(parse_shell("bash"), Ok(Shell::Bash)));
        assert!(matches!(parse_shell("Zsh"), Ok(Shell::Zsh)));
        assert!(matches!(parse_shell("FISH"), Ok(Shell::Fish)));
        assert!(parse_shell("powershell").is_err());
    }

    #[test]
    fn test_generated_scripts_name_the_binary() {
        let bash = generate_completion("bash").unwrap();
        assert!(bash.contains("_zeto"));
        assert!(bash.contains("complete -F _zeto_enhanced zeto"));

        let fish = generate_completion("fish").unwrap();
        assert!(fish.contains("complete -c zeto"));
        assert!(!fish.contains("_zeto_enhanced"));
    }
}
