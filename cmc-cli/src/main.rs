use std::env;

use anyhow::{Context, Result};

const EMBEDDED_CATALOG: &str = include_str!("cmc-catalog.yaml");
const APP_NAME: &str = "cmc";

fn main() {
    if let Err(err) = real_main() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn real_main() -> Result<()> {
    // The tree is built once here, before any resolution, and never mutated.
    let root =
        apitree::catalog::parse_catalog(EMBEDDED_CATALOG).context("Embedded catalog is invalid")?;

    let app = apitree::cli::build_cli();
    let matches = app.get_matches();

    // Only request-issuing modes need the key; drive_command enforces that.
    let api_key = env::var("CMC_KEY").ok();

    let user_agent = format!("{}/{}", APP_NAME, env!("CARGO_PKG_VERSION"));
    let exit_code =
        apitree::cli::drive_command(&root, &matches, api_key.as_deref(), &user_agent)?;
    std::process::exit(exit_code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_catalog_parses() {
        let root = apitree::catalog::parse_catalog(EMBEDDED_CATALOG).unwrap();
        assert_eq!(root.label(), "root");
        assert!(!root.children().is_empty());
    }

    #[test]
    fn test_embedded_catalog_abbreviations_resolve() {
        let root = apitree::catalog::parse_catalog(EMBEDDED_CATALOG).unwrap();
        assert_eq!(
            root.resolve_url("v1/c/q/l").unwrap(),
            "/v1/cryptocurrency/quotes/latest"
        );
        assert_eq!(
            root.expand_expression("v2/t/p").unwrap(),
            "/v2/tools/price-conversion"
        );
    }
}
