//! Maven POM parsing for Java workspace discovery (SPEC_FULL.md §4.6a).
//!
//! `jdtls` needs a classpath built from the POM before it can answer
//! anything useful, and the collector needs the same coordinates to
//! namespace external Java symbols. Parsed with `roxmltree` rather than a
//! full Maven model crate — the collector only ever reads `artifactId`,
//! `modules`, `dependencies`, and `properties`.

use std::collections::BTreeMap;
use std::path::Path;

use roxmltree::Document;

use crate::error::{CollectError, Result};

#[derive(Clone, Debug, Default)]
pub struct PomDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

#[derive(Clone, Debug, Default)]
pub struct PomFile {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub modules: Vec<String>,
    pub dependencies: Vec<PomDependency>,
}

/// Maven substitutes `${property}` placeholders via inheritance chains;
/// this crate doesn't walk parent POMs, so it caps substitution passes at
/// 10 and leaves any placeholder that never resolves as literal text rather
/// than looping or erroring (SPEC_FULL.md §4.6a).
const MAX_SUBSTITUTION_PASSES: usize = 10;

pub fn load(path: &Path) -> Result<PomFile> {
    let text = std::fs::read_to_string(path).map_err(|source| CollectError::ManifestRead {
        path: path.display().to_string(),
        source,
    })?;
    let doc = Document::parse(&text).map_err(|e| {
        CollectError::ManifestRead {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
        }
    })?;

    let root = doc.root_element();
    let properties = read_properties(&root);

    let group_id = substitute(child_text(&root, "groupId").unwrap_or_default(), &properties);
    let artifact_id = substitute(child_text(&root, "artifactId").unwrap_or_default(), &properties);
    let version = substitute(child_text(&root, "version").unwrap_or_default(), &properties);

    let modules = root
        .children()
        .find(|n| n.has_tag_name("modules"))
        .map(|modules| {
            modules
                .children()
                .filter(|n| n.has_tag_name("module"))
                .filter_map(|n| n.text())
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default();

    let dependencies = root
        .children()
        .find(|n| n.has_tag_name("dependencies"))
        .map(|deps| {
            deps.children()
                .filter(|n| n.has_tag_name("dependency"))
                .map(|dep| PomDependency {
                    group_id: substitute(child_text(&dep, "groupId").unwrap_or_default(), &properties),
                    artifact_id: substitute(child_text(&dep, "artifactId").unwrap_or_default(), &properties),
                    version: substitute(child_text(&dep, "version").unwrap_or_default(), &properties),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(PomFile {
        group_id,
        artifact_id,
        version,
        modules,
        dependencies,
    })
}

fn child_text<'a>(node: &roxmltree::Node<'a, 'a>, tag: &str) -> Option<&'a str> {
    node.children().find(|n| n.has_tag_name(tag)).and_then(|n| n.text())
}

fn read_properties(root: &roxmltree::Node) -> BTreeMap<String, String> {
    let mut props = BTreeMap::new();
    if let Some(properties_node) = root.children().find(|n| n.has_tag_name("properties")) {
        for child in properties_node.children().filter(|n| n.is_element()) {
            if let Some(text) = child.text() {
                props.insert(child.tag_name().name().to_string(), text.to_string());
            }
        }
    }
    props
}

fn substitute(mut value: String, properties: &BTreeMap<String, String>) -> String {
    for _ in 0..MAX_SUBSTITUTION_PASSES {
        let Some(start) = value.find("${") else {
            break;
        };
        let Some(end_rel) = value[start..].find('}') else {
            break;
        };
        let end = start + end_rel;
        let key = &value[start + 2..end];
        let Some(replacement) = properties.get(key) else {
            break;
        };
        value.replace_range(start..=end, replacement);
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_property_placeholders() {
        let mut props = BTreeMap::new();
        props.insert("revision".to_string(), "1.2.3".to_string());
        assert_eq!(substitute("${revision}".to_string(), &props), "1.2.3");
    }

    #[test]
    fn unresolved_placeholder_is_left_literal() {
        let props = BTreeMap::new();
        assert_eq!(substitute("${missing}".to_string(), &props), "${missing}");
    }

    #[test]
    fn parses_artifact_modules_and_dependencies() {
        let dir = tempfile::tempdir().unwrap();
        let pom = dir.path().join("pom.xml");
        std::fs::write(
            &pom,
            r#"<project>
                <groupId>com.example</groupId>
                <artifactId>app</artifactId>
                <version>1.0.0</version>
                <modules>
                    <module>core</module>
                    <module>web</module>
                </modules>
                <dependencies>
                    <dependency>
                        <groupId>org.slf4j</groupId>
                        <artifactId>slf4j-api</artifactId>
                        <version>2.0.13</version>
                    </dependency>
                </dependencies>
            </project>"#,
        )
        .unwrap();

        let parsed = load(&pom).unwrap();
        assert_eq!(parsed.artifact_id, "app");
        assert_eq!(parsed.modules, vec!["core", "web"]);
        assert_eq!(parsed.dependencies.len(), 1);
        assert_eq!(parsed.dependencies[0].artifact_id, "slf4j-api");
    }
}
