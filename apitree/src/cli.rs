use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::expr::{normalize_args, Expression, Mode};
use crate::tree::Node;
use crate::{
    execute_request, fetch_raw, pretty_json, EndpointRequest, ExecutionConfig, OutputFormat,
};

pub const PROD_BASE_URL: &str = "https://pro-api.coinmarketcap.com";
pub const SANDBOX_BASE_URL: &str = "https://sandbox-api.coinmarketcap.com";

const EXPRESSION_HELP: &str = "\
EXPRESSION GRAMMAR:
  <path>[.<args>][?|+|!]

  path   segments separated by /, each shortened to any unique prefix:
         v1/cryptocurrency/quotes/latest can be written v1/c/q/l
  args   comma-separated key=value pairs after a dot; keys abbreviate the
         same way: v2/t/p.s=rpl,convert=eth,a=1
  ?      print the endpoint and its argument documentation
  +      print the endpoint tree under the resolved node
  !      print the canonical expanded path

The API key is read from the CMC_KEY environment variable.

EXAMPLES:
  cmc \"v1/c/q/l.symbol=BTC\"
  cmc \"v2/t/p?\"
  cmc \"v1/cryptocurrency+\"
  cmc \"v1/c/q/l!\"";

#[must_use]
pub fn build_cli() -> Command {
    let app = Command::new("cmc")
        .about("CoinMarketCap API client with prefix-addressable endpoints")
        .version(env!("CARGO_PKG_VERSION"))
        .after_help(EXPRESSION_HELP)
        .arg(
            Arg::new("expression")
                .help("Endpoint expression, e.g. v1/c/q/l.symbol=BTC")
                .num_args(1)
                .index(1),
        )
        // Global options
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .short('u')
                .help("Base API URL")
                .num_args(1)
                .default_value(PROD_BASE_URL),
        )
        .arg(
            Arg::new("sandbox")
                .long("sandbox")
                .help("Use the sandbox API instead of the production API")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json-output")
                .long("json-output")
                .short('j')
                .help("Print the full response envelope instead of just data")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("conn-timeout")
                .long("conn-timeout")
                .help("Connection timeout in seconds")
                .default_value("30")
                .num_args(1),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .short('t')
                .help("Request timeout in seconds (after connection)")
                .default_value("300")
                .num_args(1),
        );

    // Escape hatch for endpoints missing from the catalog
    let raw_cmd = Command::new("raw")
        .about("GET an endpoint path verbatim, without tree resolution")
        .arg(
            Arg::new("endpoint")
                .help("Endpoint path, e.g. v1/cryptocurrency/quotes/latest")
                .required(true)
                .num_args(1),
        );
    app.subcommand(raw_cmd)
}

fn parse_timeout(matches: &ArgMatches, arg_name: &str) -> Option<f64> {
    matches
        .get_one::<String>(arg_name)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| *v >= 0.0)
}

fn require_api_key(config: &ExecutionConfig<'_>) -> Result<()> {
    if config.api_key.is_none() {
        bail!("CMC_KEY not set in environment");
    }
    Ok(())
}

/// Dispatch parsed command-line matches against the endpoint tree.
/// Returns the process exit code.
///
/// The API key is only required for modes that issue a request; the
/// offline suffixes (`?`, `+`, `!`) work without one.
///
/// # Errors
///
/// Resolution failures, malformed arguments, and HTTP failures all
/// propagate; the caller reports them and exits non-zero.
pub fn drive_command(
    root: &Node,
    matches: &ArgMatches,
    api_key: Option<&str>,
    user_agent: &str,
) -> Result<i32> {
    let base_url = if matches.get_flag("sandbox") {
        SANDBOX_BASE_URL.to_string()
    } else {
        matches
            .get_one::<String>("base-url")
            .cloned()
            .unwrap_or_else(|| PROD_BASE_URL.to_string())
    };

    let mut config = ExecutionConfig::new(user_agent, api_key);
    config.output = if matches.get_flag("json-output") {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    config.conn_timeout_secs = parse_timeout(matches, "conn-timeout");
    config.request_timeout_secs = parse_timeout(matches, "timeout");
    config.verbose = matches.get_flag("verbose");

    // RAW subcommand handled here
    if let Some(("raw", raw_m)) = matches.subcommand() {
        let endpoint = raw_m
            .get_one::<String>("endpoint")
            .cloned()
            .unwrap_or_default();
        require_api_key(&config)?;
        let req = EndpointRequest {
            base_url,
            path: endpoint,
            query: Vec::new(),
        };
        let body = fetch_raw(&req, &config)?;
        println!("{}", pretty_json(&body));
        return Ok(0);
    }

    let Some(expr_input) = matches.get_one::<String>("expression") else {
        let _ = build_cli().print_help();
        return Ok(0);
    };
    let expression = Expression::parse(expr_input);

    match expression.mode {
        Mode::Expand => {
            println!("{}", root.expand_expression(&expression.path)?);
            Ok(0)
        }
        Mode::Tree => {
            let node = root.resolve_node(&expression.path)?;
            let expanded = root.expand_expression(&expression.path)?;
            if !expanded.is_empty() {
                println!("{}", expanded);
            }
            print!("{}", node.render());
            Ok(0)
        }
        Mode::Help => {
            let leaf = root.resolve_leaf(&expression.path)?;
            print!("{}", leaf.render());
            if let Some(schema) = leaf.arg_schema() {
                print!("{}", schema.render());
            }
            Ok(0)
        }
        Mode::Get => {
            let leaf = root.resolve_leaf(&expression.path)?;
            let url = leaf.url().context("resolved leaf has no URL")?;
            let schema = leaf
                .arg_schema()
                .context("resolved leaf has no argument schema")?;
            let query = normalize_args(schema, &expression.arg_pairs()?)?;
            require_api_key(&config)?;
            let req = EndpointRequest {
                base_url,
                path: url.to_string(),
                query,
            };
            execute_request(&req, &config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{ArgDescriptor, ArgSchema};

    fn sample_tree() -> Node {
        Node::branch(
            "root",
            vec![Node::branch(
                "v1",
                vec![Node::branch(
                    "cryptocurrency",
                    vec![Node::leaf(
                        "map",
                        "/v1/cryptocurrency/map",
                        ArgSchema::new(vec![ArgDescriptor {
                            name: "symbol".to_string(),
                            type_name: "string".to_string(),
                            desc: "Symbols to filter by".to_string(),
                            default: String::new(),
                        }]),
                    )],
                )],
            )],
        )
    }

    // ==================== build_cli tests ====================

    #[test]
    fn test_build_cli_parses_expression() {
        let matches = build_cli()
            .try_get_matches_from(["cmc", "v1/c/q/l"])
            .unwrap();
        assert_eq!(
            matches.get_one::<String>("expression"),
            Some(&"v1/c/q/l".to_string())
        );
    }

    #[test]
    fn test_build_cli_default_base_url() {
        let matches = build_cli().try_get_matches_from(["cmc", "v1/c"]).unwrap();
        assert_eq!(
            matches.get_one::<String>("base-url"),
            Some(&PROD_BASE_URL.to_string())
        );
        assert!(!matches.get_flag("sandbox"));
    }

    #[test]
    fn test_build_cli_flags() {
        let matches = build_cli()
            .try_get_matches_from(["cmc", "-j", "-v", "--sandbox", "v1/c"])
            .unwrap();
        assert!(matches.get_flag("json-output"));
        assert!(matches.get_flag("verbose"));
        assert!(matches.get_flag("sandbox"));
    }

    #[test]
    fn test_build_cli_raw_subcommand() {
        let matches = build_cli()
            .try_get_matches_from(["cmc", "raw", "v1/key/info"])
            .unwrap();
        let Some(("raw", raw_m)) = matches.subcommand() else {
            panic!("expected raw subcommand");
        };
        assert_eq!(
            raw_m.get_one::<String>("endpoint"),
            Some(&"v1/key/info".to_string())
        );
    }

    #[test]
    fn test_build_cli_raw_requires_endpoint() {
        assert!(build_cli().try_get_matches_from(["cmc", "raw"]).is_err());
    }

    // ==================== parse_timeout tests ====================

    #[test]
    fn test_parse_timeout_default() {
        let matches = build_cli().try_get_matches_from(["cmc", "v1/c"]).unwrap();
        assert_eq!(parse_timeout(&matches, "conn-timeout"), Some(30.0));
        assert_eq!(parse_timeout(&matches, "timeout"), Some(300.0));
    }

    #[test]
    fn test_parse_timeout_rejects_negative() {
        let matches = build_cli()
            .try_get_matches_from(["cmc", "--timeout", "-5", "v1/c"])
            .unwrap();
        assert_eq!(parse_timeout(&matches, "timeout"), None);
    }

    // ==================== drive_command tests (offline modes) ====================

    #[test]
    fn test_drive_expand_mode_without_api_key() {
        let tree = sample_tree();
        let matches = build_cli()
            .try_get_matches_from(["cmc", "v1/c/m!"])
            .unwrap();
        let code = drive_command(&tree, &matches, None, "cmc-tests/0.1").unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn test_drive_tree_mode_without_api_key() {
        let tree = sample_tree();
        let matches = build_cli().try_get_matches_from(["cmc", "v1+"]).unwrap();
        let code = drive_command(&tree, &matches, None, "cmc-tests/0.1").unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn test_drive_help_mode_on_grouping_node_fails() {
        let tree = sample_tree();
        let matches = build_cli()
            .try_get_matches_from(["cmc", "v1/cryptocurrency?"])
            .unwrap();
        let err = drive_command(&tree, &matches, None, "cmc-tests/0.1").unwrap_err();
        assert!(err.to_string().contains("not an endpoint"));
    }

    #[test]
    fn test_drive_get_mode_requires_api_key() {
        let tree = sample_tree();
        let matches = build_cli()
            .try_get_matches_from(["cmc", "v1/c/m.symbol=BTC"])
            .unwrap();
        let err = drive_command(&tree, &matches, None, "cmc-tests/0.1").unwrap_err();
        assert!(err.to_string().contains("CMC_KEY"));
    }

    #[test]
    fn test_drive_get_mode_rejects_bad_argument_before_network() {
        let tree = sample_tree();
        let matches = build_cli()
            .try_get_matches_from(["cmc", "v1/c/m.nope=1"])
            .unwrap();
        let err = drive_command(&tree, &matches, None, "cmc-tests/0.1").unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_drive_ambiguous_path_propagates() {
        let tree = Node::branch(
            "root",
            vec![
                Node::leaf("quotes", "/quotes", ArgSchema::default()),
                Node::leaf("quarters", "/quarters", ArgSchema::default()),
            ],
        );
        let matches = build_cli().try_get_matches_from(["cmc", "q!"]).unwrap();
        let err = drive_command(&tree, &matches, None, "cmc-tests/0.1").unwrap_err();
        assert!(err.to_string().contains("ambiguous"));
    }
}
