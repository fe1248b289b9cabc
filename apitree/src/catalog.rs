use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::tree::{ArgDescriptor, ArgSchema, Node};

/// On-disk form of one endpoint tree node. A node declares either `children`
/// (a namespace grouping) or `url` (an endpoint), never both.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogNode {
    pub label: String,
    #[serde(default)]
    pub children: Vec<CatalogNode>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub args: Vec<CatalogArg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogArg {
    pub name: String,
    #[serde(default, rename = "type")]
    pub arg_type: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub default: String,
}

/// Load an endpoint catalog from YAML and build the immutable tree.
///
/// # Errors
///
/// Fails on YAML that does not parse, nodes that are both or neither
/// grouping and endpoint, duplicate sibling labels, or duplicate argument
/// names within one endpoint.
pub fn parse_catalog(yaml: &str) -> Result<Node> {
    let root: CatalogNode = serde_yaml::from_str(yaml).context("Failed to parse catalog YAML")?;
    build_node(&root, "")
}

fn build_node(entry: &CatalogNode, parent_path: &str) -> Result<Node> {
    let path = if parent_path.is_empty() {
        entry.label.clone()
    } else {
        format!("{}/{}", parent_path, entry.label)
    };

    match (&entry.url, entry.children.is_empty()) {
        (Some(url), true) => {
            let mut seen: HashSet<&str> = HashSet::new();
            for arg in &entry.args {
                if !seen.insert(arg.name.as_str()) {
                    bail!(
                        "catalog endpoint \"{}\" declares argument \"{}\" twice",
                        path,
                        arg.name
                    );
                }
            }
            let descriptors = entry
                .args
                .iter()
                .map(|a| ArgDescriptor {
                    name: a.name.clone(),
                    type_name: a.arg_type.clone(),
                    desc: a.desc.clone(),
                    default: a.default.clone(),
                })
                .collect();
            Ok(Node::leaf(&entry.label, url, ArgSchema::new(descriptors)))
        }
        (None, false) => {
            let mut seen: HashSet<&str> = HashSet::new();
            for child in &entry.children {
                if !seen.insert(child.label.as_str()) {
                    bail!(
                        "catalog node \"{}\" has duplicate child label \"{}\"",
                        path,
                        child.label
                    );
                }
            }
            let children = entry
                .children
                .iter()
                .map(|c| build_node(c, &path))
                .collect::<Result<Vec<Node>>>()?;
            Ok(Node::branch(&entry.label, children))
        }
        (Some(_), false) => bail!("catalog node \"{}\" has both url and children", path),
        (None, true) => bail!("catalog node \"{}\" has neither url nor children", path),
    }
}
